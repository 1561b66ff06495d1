//! Profile route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::Redirect,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::erp::{ErpError, Profile};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Flash, flash, session_keys};
use crate::routes::layout::Layout;
use crate::state::AppState;

const UPDATED: &str = "Profile updated successfully!";
const EDIT_PATH: &str = "/profile?edit=1";

/// Profile page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub edit: Option<String>,
}

/// Profile edit form data.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    pub business_name: String,
    pub proprietor_name: String,
    pub phone: String,
    pub address: String,
    pub license_no: String,
    #[serde(default)]
    pub license_expiry: String,
}

impl ProfileForm {
    /// Build the update body; a blank expiry clears the date.
    fn into_profile(self) -> std::result::Result<Profile, String> {
        let expiry = self.license_expiry.trim();
        let license_expiry = if expiry.is_empty() {
            None
        } else {
            Some(
                NaiveDate::parse_from_str(expiry, "%Y-%m-%d")
                    .map_err(|_| "Please enter a valid license expiry date.".to_string())?,
            )
        };
        if self.proprietor_name.trim().is_empty() {
            return Err("Proprietor name is required.".to_string());
        }

        Ok(Profile {
            business_name: self.business_name.trim().to_string(),
            proprietor_name: self.proprietor_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            license_no: self.license_no.trim().to_string(),
            license_expiry,
            email: None,
        })
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile/show.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub profile: Profile,
    /// `YYYY-MM-DD`, or empty.
    pub license_expiry: String,
    pub editing: bool,
}

/// Display the profile, editable with `?edit=1`.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ProfileQuery>,
) -> Result<ProfileTemplate> {
    let profile = state.erp().profile(&user.token).await?;
    Ok(ProfileTemplate {
        license_expiry: profile
            .license_expiry
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        editing: query.edit.is_some(),
        profile,
        layout: Layout::load(&session, Some(user)).await,
    })
}

/// Save profile changes.
///
/// The header shows the proprietor's name, so the session user is refreshed
/// from what the ERP returns.
#[instrument(skip(state, session, user, form))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(mut user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let profile = match form.into_profile() {
        Ok(profile) => profile,
        Err(message) => {
            flash::push(&session, Flash::error(message)).await;
            return Ok(Redirect::to(EDIT_PATH));
        }
    };

    match state.erp().update_profile(&user.token, &profile).await {
        Ok(saved) => {
            let name = if saved.proprietor_name.is_empty() {
                profile.proprietor_name
            } else {
                saved.proprietor_name
            };
            user.name = name;
            session.insert(session_keys::CURRENT_USER, &user).await?;
            tracing::info!(party_id = %user.party_id, "Profile updated");
            flash::push(&session, Flash::success(UPDATED)).await;
            Ok(Redirect::to("/profile"))
        }
        Err(e @ (ErpError::Validation(_) | ErpError::Forbidden(_) | ErpError::NotFound)) => {
            let message = e
                .validation_message()
                .unwrap_or_else(|| "Could not update your profile.".to_string());
            flash::push(&session, Flash::error(message)).await;
            Ok(Redirect::to(EDIT_PATH))
        }
        Err(e) => Err(AppError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ProfileForm {
        ProfileForm {
            business_name: " City Pharmacy ".to_string(),
            proprietor_name: "Anita Rao".to_string(),
            phone: "9876543210".to_string(),
            address: "12 MG Road".to_string(),
            license_no: "KA-20B-1234".to_string(),
            license_expiry: "2027-03-31".to_string(),
        }
    }

    #[test]
    fn test_form_into_profile() {
        let profile = form().into_profile().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(profile.business_name, "City Pharmacy");
        assert_eq!(
            profile.license_expiry,
            NaiveDate::from_ymd_opt(2027, 3, 31)
        );
    }

    #[test]
    fn test_blank_expiry_clears_date() {
        let profile = ProfileForm {
            license_expiry: " ".to_string(),
            ..form()
        }
        .into_profile()
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(profile.license_expiry, None);
    }

    #[test]
    fn test_invalid_form() {
        let bad_date = ProfileForm {
            license_expiry: "March 2027".to_string(),
            ..form()
        };
        assert!(bad_date.into_profile().is_err());

        let no_name = ProfileForm {
            proprietor_name: String::new(),
            ..form()
        };
        assert_eq!(
            no_name.into_profile().err().as_deref(),
            Some("Proprietor name is required.")
        );
    }
}
