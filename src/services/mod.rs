// Service layer for KomplekIn Backend

pub mod dues;
pub mod email;
pub mod jwt;
pub mod payment;
pub mod storage;
pub mod token;

pub use dues::DuesService;
pub use email::EmailService;
pub use jwt::{AccessTokenClaims, JwtConfig, JwtError, JwtService};
pub use payment::PaymentService;
pub use storage::{StorageError, StorageService};
pub use token::{TokenInfo, TokenService};
