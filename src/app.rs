// Application state and configuration
use std::sync::Arc;

use crate::{
    db::DieselPool,
    services::{DuesService, EmailService, JwtService, PaymentService, StorageService, TokenService},
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub diesel_pool: DieselPool,
    pub jwt_service: Arc<JwtService>,
    pub token_service: Arc<TokenService>,
    pub dues_service: Arc<DuesService>,
    pub payment_service: Arc<PaymentService>,
    pub email_service: Arc<EmailService>,
    pub storage_service: Arc<StorageService>,
    pub max_connections: u32,
}
