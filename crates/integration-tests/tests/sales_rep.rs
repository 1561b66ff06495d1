//! Sales representatives ordering and managing orders for a customer.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use ok_distributor_integration_tests::{PASSWORD, REP_EMAIL, TestContext, final_path};

async fn order_for_city_pharmacy(ctx: &TestContext) {
    ctx.post_form(
        "/cart/add",
        &[("product_id", "3"), ("quantity", "4"), ("bid_price", "11.25")],
    )
    .await;
    ctx.post_form("/cart/checkout", &[("delivery_address", "12 MG Road, Bengaluru")])
        .await;
}

#[tokio::test]
async fn test_ordering_pages_require_a_selected_customer() {
    let ctx = TestContext::spawn().await;
    ctx.login(REP_EMAIL, PASSWORD).await;

    for path in ["/catalog", "/cart", "/orders"] {
        let response = ctx.get(path).await;
        assert_eq!(final_path(&response), "/customers", "for {path}");
    }
}

#[tokio::test]
async fn test_search_and_select_customer() {
    let ctx = TestContext::spawn().await;
    ctx.login(REP_EMAIL, PASSWORD).await;

    let body = ctx.get("/customers?q=green").await.text().await.unwrap();
    assert!(body.contains("Green Cross Chemists"));
    assert!(!body.contains("City Pharmacy"));

    let response = ctx.post_form("/customers/select", &[("party_id", "99")]).await;
    assert_eq!(final_path(&response), "/customers");
    assert!(response.text().await.unwrap().contains("Customer not found."));

    let response = ctx.post_form("/customers/select", &[("party_id", "1")]).await;
    assert_eq!(final_path(&response), "/catalog");
    let body = response.text().await.unwrap();
    assert!(body.contains("Now ordering for City Pharmacy."));
    assert!(body.contains("Ordering for <strong>City Pharmacy</strong>"));
}

#[tokio::test]
async fn test_order_is_placed_for_selected_customer() {
    let ctx = TestContext::spawn().await;
    ctx.login_rep_for_city_pharmacy().await;

    let cart = ctx.get("/cart").await.text().await.unwrap();
    assert!(cart.contains("Your cart is empty."));

    ctx.post_form(
        "/cart/add",
        &[("product_id", "3"), ("quantity", "4"), ("bid_price", "11.25")],
    )
    .await;
    let cart = ctx.get("/cart").await.text().await.unwrap();
    assert!(cart.contains("Cart for City Pharmacy"));
    // Checkout is prefilled with the customer's address on file.
    assert!(cart.contains(">12 MG Road, Bengaluru</textarea>"));

    let response = ctx
        .post_form("/cart/checkout", &[("delivery_address", "12 MG Road, Bengaluru")])
        .await;
    assert_eq!(final_path(&response), "/orders");
    let body = response.text().await.unwrap();
    assert!(body.contains("Orders for City Pharmacy"));
    assert!(body.contains("Record payment"));

    let orders = ctx.erp.data().orders.clone();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["party_id"], 1);
    assert_eq!(orders[0]["items"][0]["bid_price"], "11.25");
}

#[tokio::test]
async fn test_switching_customer_empties_cart() {
    let ctx = TestContext::spawn().await;
    ctx.login_rep_for_city_pharmacy().await;
    ctx.post_form(
        "/cart/add",
        &[("product_id", "1"), ("quantity", "1"), ("bid_price", "10")],
    )
    .await;

    ctx.post_form("/customers/select", &[("party_id", "2")]).await;
    let badge = ctx.get("/cart/count").await.text().await.unwrap();
    assert_eq!(badge.trim(), "");

    let response = ctx.post_form("/customers/clear", &[]).await;
    assert_eq!(final_path(&response), "/customers");
    let response = ctx.get("/catalog").await;
    assert_eq!(final_path(&response), "/customers");
}

#[tokio::test]
async fn test_status_transitions() {
    let ctx = TestContext::spawn().await;
    ctx.login_rep_for_city_pharmacy().await;
    order_for_city_pharmacy(&ctx).await;

    let response = ctx
        .post_form("/orders/1/status", &[("status", "delivered")])
        .await;
    assert_eq!(final_path(&response), "/orders?open=1");
    let body = response.text().await.unwrap();
    assert!(body.contains("Order #1 is Pending and cannot be marked Delivered."));
    assert_eq!(ctx.erp.data().orders[0]["status"], "pending");

    let response = ctx
        .post_form("/orders/1/status", &[("status", "confirmed")])
        .await;
    let body = response.text().await.unwrap();
    assert!(body.contains("Order #1 marked Confirmed."));
    assert!(body.contains("id=\"order-1\" open"));
    assert_eq!(ctx.erp.data().orders[0]["status"], "confirmed");
}

#[tokio::test]
async fn test_refused_status_change_keeps_session_and_cart() {
    let ctx = TestContext::spawn().await;
    ctx.login_rep_for_city_pharmacy().await;
    order_for_city_pharmacy(&ctx).await;
    ctx.post_form(
        "/cart/add",
        &[("product_id", "2"), ("quantity", "2"), ("bid_price", "10.00")],
    )
    .await;
    ctx.erp.data().forbid_status_changes = true;

    let response = ctx
        .post_form("/orders/1/status", &[("status", "confirmed")])
        .await;
    assert_eq!(final_path(&response), "/orders?open=1");
    let body = response.text().await.unwrap();
    assert!(body.contains("You do not have permission to perform this action."));
    assert_eq!(ctx.erp.data().orders[0]["status"], "pending");

    // Still logged in, still acting for the customer, cart untouched.
    let badge = ctx.get("/cart/count").await.text().await.unwrap();
    assert_eq!(badge.trim(), "2");
    let response = ctx.get("/catalog").await;
    assert_eq!(final_path(&response), "/catalog");
}

#[tokio::test]
async fn test_record_payments_against_balance() {
    let ctx = TestContext::spawn().await;
    ctx.login_rep_for_city_pharmacy().await;
    order_for_city_pharmacy(&ctx).await;

    // 4 x 11.25 = 45.00 owed.
    let response = ctx
        .post_form(
            "/orders/1/payments",
            &[("amount", "50"), ("mode", "cash"), ("reference", "")],
        )
        .await;
    let body = response.text().await.unwrap();
    assert!(body.contains("Payment of $50.00 exceeds the outstanding balance of $45.00."));

    let response = ctx
        .post_form(
            "/orders/1/payments",
            &[("amount", "abc"), ("mode", "cash"), ("reference", "")],
        )
        .await;
    assert!(response.text().await.unwrap().contains("Please enter a valid payment amount."));

    let response = ctx
        .post_form(
            "/orders/1/payments",
            &[("amount", "20.00"), ("mode", "upi"), ("reference", "UPI-7731")],
        )
        .await;
    assert_eq!(final_path(&response), "/orders?open=1");
    let body = response.text().await.unwrap();
    assert!(body.contains("Payment of $20.00 recorded for order #1."));
    assert!(body.contains("UPI-7731"));

    let payments = ctx.erp.data().orders[0]["payments"].clone();
    assert_eq!(payments[0]["amount"], "20.00");
    assert_eq!(payments[0]["mode"], "upi");
    assert_eq!(payments[0]["reference"], "UPI-7731");

    ctx.post_form(
        "/orders/1/payments",
        &[("amount", "25"), ("mode", "cheque"), ("reference", "")],
    )
    .await;
    let body = ctx.get("/orders?open=1").await.text().await.unwrap();
    assert!(!body.contains("Record payment"));
}
