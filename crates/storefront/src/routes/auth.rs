//! Authentication route handlers.
//!
//! Handles login, registration and password reset. Credentials are checked
//! by the ERP; on failure the form is re-rendered with an error toast and the
//! visitor's input kept.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use ok_distributor_core::Email;
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::erp::{ErpError, RegistrationRequest};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Flash, flash};
use crate::routes::layout::Layout;
use crate::state::AppState;

const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
const UNEXPECTED: &str = "An unexpected error occurred. Please try again.";
const REGISTRATION_FAILED: &str = "Registration failed.";
const REGISTERED: &str = "Registration successful! Please log in.";
const PASSWORDS_DIFFER: &str = "Passwords do not match.";
const NO_SUCH_ACCOUNT: &str = "No account found with this email address.";
const PASSWORD_RESET: &str =
    "Password has been reset successfully. Please log in with your new password.";
const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub business_name: String,
    pub proprietor_name: String,
    pub phone: String,
    pub address: String,
    pub license_no: String,
    pub license_expiry: String,
    pub email: String,
    pub password: String,
}

/// Reset password form data.
#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordForm {
    pub email: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Query parameters of the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Set when the ERP rejected a stored token.
    pub expired: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub form: RegisterForm,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub layout: Layout,
    pub email: String,
}

async fn error_layout(session: &Session, message: impl Into<String>) -> Layout {
    let mut layout = Layout::load(session, None).await;
    layout.flashes.push(Flash::error(message));
    layout
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
///
/// Logged-in visitors are sent on to their start page. A visitor bounced
/// here by an expired token has the stale session dropped first.
pub async fn login_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> Response {
    if query.expired.is_some() {
        if let Err(e) = clear_current_user(&session).await {
            tracing::error!("Failed to clear expired session: {e}");
        }
        clear_sentry_user();
        return LoginTemplate {
            layout: error_layout(&session, SESSION_EXPIRED).await,
            email: String::new(),
        }
        .into_response();
    }

    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        layout: Layout::load(&session, None).await,
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let password = SecretString::from(form.password);

    let message = match state.erp().login(form.email.trim(), &password).await {
        Ok(auth) => {
            let user = CurrentUser::from_login(auth, &form.email);
            if let Err(e) = set_current_user(&session, &user).await {
                tracing::error!("Failed to set session: {e}");
                UNEXPECTED.to_string()
            } else {
                set_sentry_user(&user.party_id, Some(&user.email));
                add_breadcrumb("auth", "Logged in", Some(&[("role", user.role.label())]));
                tracing::info!(party_id = %user.party_id, role = %user.role, "Logged in");
                return Redirect::to("/").into_response();
            }
        }
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            login_failure_message(&e)
        }
    };

    LoginTemplate {
        layout: error_layout(&session, message).await,
        email: form.email,
    }
    .into_response()
}

/// Toast text for a failed login.
fn login_failure_message(error: &ErpError) -> String {
    match error {
        ErpError::Validation(_) => error
            .first_message()
            .unwrap_or(LOGIN_FAILED)
            .to_string(),
        ErpError::Forbidden(_) => error
            .validation_message()
            .unwrap_or_else(|| LOGIN_FAILED.to_string()),
        ErpError::Unauthorized | ErpError::NotFound => LOGIN_FAILED.to_string(),
        _ => UNEXPECTED.to_string(),
    }
}

/// Log out: drop the session, including the cart and selected customer.
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }
    clear_sentry_user();
    Redirect::to("/auth/login")
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(session: Session) -> impl IntoResponse {
    RegisterTemplate {
        layout: Layout::load(&session, None).await,
        form: RegisterForm::default(),
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let request = match registration_request(&form) {
        Ok(request) => request,
        Err(message) => {
            return RegisterTemplate {
                layout: error_layout(&session, message).await,
                form,
            }
            .into_response();
        }
    };

    match state.erp().register(&request).await {
        Ok(message) => {
            tracing::info!("Registered new party");
            flash::push(
                &session,
                Flash::success(message.unwrap_or_else(|| REGISTERED.to_string())),
            )
            .await;
            Redirect::to("/auth/login").into_response()
        }
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            let message = match &e {
                ErpError::Validation(_) => e
                    .validation_message()
                    .unwrap_or_else(|| REGISTRATION_FAILED.to_string()),
                _ if e.is_upstream_failure() => UNEXPECTED.to_string(),
                _ => REGISTRATION_FAILED.to_string(),
            };
            RegisterTemplate {
                layout: error_layout(&session, message).await,
                form,
            }
            .into_response()
        }
    }
}

/// Validate the registration form locally before it goes to the ERP.
fn registration_request(form: &RegisterForm) -> Result<RegistrationRequest, String> {
    let required = [
        (&form.business_name, "Business name is required."),
        (&form.proprietor_name, "Proprietor name is required."),
        (&form.phone, "Phone number is required."),
        (&form.address, "Address is required."),
        (&form.license_no, "Drug license number is required."),
        (&form.password, "Password is required."),
    ];
    if let Some((_, message)) = required.iter().find(|(value, _)| value.trim().is_empty()) {
        return Err((*message).to_string());
    }

    let email = Email::parse(&form.email).map_err(|e| format!("Invalid email: {e}."))?;
    let license_expiry = NaiveDate::parse_from_str(form.license_expiry.trim(), "%Y-%m-%d")
        .map_err(|_| "Please enter a valid license expiry date.".to_string())?;

    Ok(RegistrationRequest {
        name: form.business_name.trim().to_string(),
        proprietor: form.proprietor_name.trim().to_string(),
        phone: form.phone.trim().to_string(),
        email: email.into_inner(),
        license_no: form.license_no.trim().to_string(),
        license_expiry,
        password: SecretString::from(form.password.clone()),
        address: form.address.trim().to_string(),
    })
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the reset password page.
pub async fn reset_password_page(session: Session) -> impl IntoResponse {
    ResetPasswordTemplate {
        layout: Layout::load(&session, None).await,
        email: String::new(),
    }
}

/// Handle reset password form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    if form.new_password != form.confirm_password {
        return ResetPasswordTemplate {
            layout: error_layout(&session, PASSWORDS_DIFFER).await,
            email: form.email,
        }
        .into_response();
    }
    if form.new_password.is_empty() {
        return ResetPasswordTemplate {
            layout: error_layout(&session, "Please enter a new password.").await,
            email: form.email,
        }
        .into_response();
    }

    let password = SecretString::from(form.new_password);
    match state
        .erp()
        .reset_password(form.email.trim(), &password)
        .await
    {
        Ok(message) => {
            flash::push(
                &session,
                Flash::success(message.unwrap_or_else(|| PASSWORD_RESET.to_string())),
            )
            .await;
            Redirect::to("/auth/login").into_response()
        }
        Err(e) => {
            tracing::warn!("Password reset failed: {e}");
            let message = match &e {
                ErpError::NotFound => NO_SUCH_ACCOUNT.to_string(),
                ErpError::Validation(_) => e
                    .validation_message()
                    .unwrap_or_else(|| NO_SUCH_ACCOUNT.to_string()),
                _ => UNEXPECTED.to_string(),
            };
            ResetPasswordTemplate {
                layout: error_layout(&session, message).await,
                email: form.email,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> RegisterForm {
        RegisterForm {
            business_name: "City Pharmacy".to_string(),
            proprietor_name: "Anita Rao".to_string(),
            phone: "9876543210".to_string(),
            address: "12 MG Road, Bengaluru".to_string(),
            license_no: "KA-20B-1234".to_string(),
            license_expiry: "2027-03-31".to_string(),
            email: "Anita@CityPharmacy.Example".to_string(),
            password: "s3cret-pass".to_string(),
        }
    }

    #[test]
    fn test_registration_request_normalises_email() {
        let request = registration_request(&filled_form()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(request.email, "Anita@citypharmacy.example");
        assert_eq!(request.license_expiry.to_string(), "2027-03-31");
    }

    #[test]
    fn test_registration_request_rejects_missing_fields() {
        let form = RegisterForm {
            license_no: "  ".to_string(),
            ..filled_form()
        };
        assert_eq!(
            registration_request(&form).err().as_deref(),
            Some("Drug license number is required.")
        );

        let form = RegisterForm {
            license_expiry: "31/03/2027".to_string(),
            ..filled_form()
        };
        assert_eq!(
            registration_request(&form).err().as_deref(),
            Some("Please enter a valid license expiry date.")
        );
    }

    #[test]
    fn test_login_failure_messages() {
        let rejected = ErpError::Validation(vec![
            "Unable to log in with provided credentials.".to_string(),
        ]);
        assert_eq!(
            login_failure_message(&rejected),
            "Unable to log in with provided credentials."
        );
        assert_eq!(
            login_failure_message(&ErpError::Validation(Vec::new())),
            LOGIN_FAILED
        );
        assert_eq!(
            login_failure_message(&ErpError::Status {
                status: 500,
                body: String::new()
            }),
            UNEXPECTED
        );
    }
}
