// Authentication handlers
// Login, email verification, and the password reset flow.

use axum::{extract::State, response::Json};
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        user::{LoginRequest, LoginResponse, User, UserError, UserInfo},
        verification_token::{
            ForgotPasswordRequest, ResetPasswordRequest, TokenPurpose, VerifyEmailRequest,
        },
    },
    utils::{check_password_complexity, hash_password, verify_password, ApiError, ApiResponse},
};

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let user = match User::find_by_email(&mut conn, &request.email).await {
        Ok(user) => user,
        Err(UserError::NotFound) => {
            tracing::warn!(email = %request.email, "Login attempt for unknown email");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    let password_ok =
        verify_password(&request.password, &user.password_hash).map_err(|_| ApiError::Internal)?;
    if !password_ok {
        tracing::warn!(user_id = %user.id, "Login attempt with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(ApiError::AccountInactive);
    }

    let access_token = state
        .jwt_service
        .generate_access_token(&user)
        .map_err(|_| ApiError::Internal)?;

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(ApiResponse::ok(LoginResponse {
        access_token,
        expires_in: state.jwt_service.expiry_seconds(),
        token_type: "Bearer".to_string(),
        user: UserInfo::from(&user),
    }))
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    request.validate()?;

    let user_id = state
        .token_service
        .validate_and_consume(&request.token, TokenPurpose::EmailVerification)
        .await?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;
    User::mark_email_verified(&mut conn, user_id).await?;

    tracing::info!(user_id = %user_id, "Email verified");

    Ok(ApiResponse::message_only("Email verified successfully"))
}

/// POST /api/auth/forgot-password
/// Always answers 200 so the endpoint cannot be used to enumerate accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    request.validate()?;

    const RESPONSE_MESSAGE: &str =
        "If that email is registered, a password reset link has been sent";

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    match User::find_by_email(&mut conn, &request.email).await {
        Ok(user) if user.is_active => {
            let info = state
                .token_service
                .issue(user.id, TokenPurpose::PasswordReset)
                .await?;

            // Delivery happens off the request path; failures are logged
            let email_service = state.email_service.clone();
            let to_email = user.email.clone();
            let full_name = user.full_name.clone();
            tokio::spawn(async move {
                if let Err(e) = email_service
                    .send_password_reset_email(&to_email, &full_name, &info.token)
                    .await
                {
                    tracing::error!(error = %e, "Failed to send password reset email");
                }
            });
        }
        Ok(_) | Err(UserError::NotFound) => {
            // Keep the miss path from answering noticeably faster
            let delay = crate::app_config::config().tokens.miss_delay_ms;
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(ApiResponse::message_only(RESPONSE_MESSAGE))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    request.validate()?;
    request
        .validate_passwords_match()
        .map_err(ApiError::Validation)?;
    check_password_complexity(&request.new_password).map_err(ApiError::Validation)?;

    let user_id = state
        .token_service
        .validate_and_consume(&request.token, TokenPurpose::PasswordReset)
        .await?;

    let new_hash = hash_password(&request.new_password).map_err(|_| ApiError::Internal)?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;
    User::set_password_hash(&mut conn, user_id, &new_hash).await?;

    let user = User::find_by_id(&mut conn, user_id).await?;
    let email_service = state.email_service.clone();
    tokio::spawn(async move {
        if let Err(e) = email_service
            .send_password_change_notification(&user.email, &user.full_name)
            .await
        {
            tracing::error!(error = %e, "Failed to send password change notification");
        }
    });

    tracing::info!(user_id = %user_id, "Password reset completed");

    Ok(ApiResponse::message_only("Password has been reset"))
}

/// GET /api/user/me
pub async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let user = User::find_by_id(&mut conn, auth_user.user_id).await?;

    Ok(ApiResponse::ok(UserInfo::from(&user)))
}
