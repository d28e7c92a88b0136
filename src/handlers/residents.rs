// Resident onboarding handlers (admin only)
// An admin invites a resident; the account starts with a random placeholder
// password and becomes usable once the resident verifies their email and
// sets a password through the reset flow.

use axum::{extract::State, response::Json};
use diesel_async::RunQueryDsl;
use rand::distributions::Alphanumeric;
use rand::Rng;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        user::{CreateResidentRequest, CreateResidentResponse, NewUser, User, UserInfo, UserRole},
        verification_token::TokenPurpose,
    },
    schema::users,
    utils::{hash_password, trim_and_validate_field, trim_optional_field, ApiError, ApiResponse},
};

fn placeholder_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// POST /api/admin/residents
pub async fn create_resident(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(request): Json<CreateResidentRequest>,
) -> Result<Json<ApiResponse<CreateResidentResponse>>, ApiError> {
    request.validate()?;
    let email = trim_and_validate_field(&request.email, true).map_err(ApiError::Validation)?;
    let full_name =
        trim_and_validate_field(&request.full_name, true).map_err(ApiError::Validation)?;
    let phone = trim_optional_field(request.phone.as_ref());

    // Placeholder credential; the resident sets their real password through
    // the reset flow after verifying their email
    let password_hash =
        hash_password(&placeholder_password()).map_err(|_| ApiError::Internal)?;

    let new_user = NewUser {
        email: email.to_lowercase(),
        password_hash,
        full_name,
        role: UserRole::Resident.as_str().to_string(),
        cluster_id: auth_user.cluster_id,
        phone,
        is_active: true,
        email_verified: false,
    };

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let user: User = diesel::insert_into(users::table)
        .values(&new_user)
        .get_result(&mut conn)
        .await
        .map_err(|e| ApiError::from(crate::models::user::UserError::from(e)))?;

    let info = state
        .token_service
        .issue(user.id, TokenPurpose::EmailVerification)
        .await?;

    // Invitation failure is logged, never rolls back the account
    let email_service = state.email_service.clone();
    let to_email = user.email.clone();
    let name = user.full_name.clone();
    tokio::spawn(async move {
        if let Err(e) = email_service
            .send_verification_email(&to_email, &name, &info.token)
            .await
        {
            tracing::error!(error = %e, "Failed to send invitation email");
        }
    });

    tracing::info!(
        user_id = %user.id,
        cluster_id = %user.cluster_id,
        "Resident account created"
    );

    Ok(ApiResponse::ok_with_message(
        CreateResidentResponse {
            user_id: user.id.to_string(),
            email: user.email,
            full_name: user.full_name,
            invitation_sent: true,
        },
        "Resident created; invitation email queued",
    ))
}

/// GET /api/admin/residents
pub async fn list_residents(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ApiError> {
    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let residents = User::list_residents(&mut conn, auth_user.cluster_id).await?;
    let infos = residents.iter().map(UserInfo::from).collect();

    Ok(ApiResponse::ok(infos))
}
