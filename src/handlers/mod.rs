// HTTP handlers for KomplekIn Backend

pub mod auth;
pub mod dues;
pub mod invoices;
pub mod residents;

use crate::app::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

// Authentication routes (public)
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/verify-email", post(auth::verify_email))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
}

// Resident routes (authenticated)
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(auth::get_current_user))
        .route("/invoices", get(invoices::list_my_invoices))
        .route("/invoices/{id}", get(invoices::get_my_invoice))
        .route("/invoices/{id}/payment", post(invoices::submit_payment))
}

// Admin routes (authenticated + admin role)
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/residents",
            get(residents::list_residents).post(residents::create_resident),
        )
        .route("/dues", get(dues::list_dues).post(dues::create_dues))
        .route("/dues/{id}", get(dues::get_dues))
        .route("/dues/{id}/participants", put(dues::update_participants))
        .route("/invoices", get(invoices::list_cluster_invoices))
        .route("/invoices/{id}/ledger", get(invoices::invoice_ledger))
        .route("/invoices/{id}/review", post(invoices::review_invoice))
}
