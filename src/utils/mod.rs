// Utility modules for KomplekIn Backend

pub mod api_errors;
pub mod password;
pub mod validation;

pub use api_errors::{ApiError, ApiErrorResponse, ApiResponse};
pub use password::{check_password_complexity, hash_password, verify_password, PasswordError};
pub use validation::{trim_and_validate_field, trim_optional_field};
