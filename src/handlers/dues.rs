// Dues management handlers (admin only)

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::NaiveDate;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        dues::{
            CreateDuesRequest, DuesDefinition, DuesDefinitionResponse,
            ParticipantUpdateResponse, UpdateParticipantsRequest,
        },
        user::User,
    },
    utils::{ApiError, ApiResponse},
};

/// Queue overdue reminders for freshly generated invoices. Failures are
/// logged by the sender; nothing here blocks the request.
fn queue_reminders(
    state: &AppState,
    definition: &DuesDefinition,
    targets: Vec<(Uuid, NaiveDate)>,
) {
    if targets.is_empty() {
        return;
    }

    let pool = state.diesel_pool.clone();
    let email_service = state.email_service.clone();
    let dues_name = definition.name.clone();
    let amount = definition.amount;

    tokio::spawn(async move {
        let mut conn = match pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "Could not load reminder recipients");
                return;
            }
        };

        for (user_id, due_date) in targets {
            let user = match User::find_by_id(&mut conn, user_id).await {
                Ok(user) => user,
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Reminder recipient lookup failed");
                    continue;
                }
            };

            if let Err(e) = email_service
                .send_overdue_reminder(&user.email, &user.full_name, &dues_name, amount, due_date)
                .await
            {
                tracing::error!(user_id = %user_id, error = %e, "Failed to send overdue reminder");
            }
        }
    });
}

/// POST /api/admin/dues
pub async fn create_dues(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(request): Json<CreateDuesRequest>,
) -> Result<Json<ApiResponse<DuesDefinitionResponse>>, ApiError> {
    request.validate()?;
    request.validate_date_range().map_err(ApiError::Validation)?;

    let creation = state
        .dues_service
        .create_definition(auth_user.cluster_id, &request)
        .await?;

    queue_reminders(&state, &creation.definition, creation.reminder_targets);

    Ok(ApiResponse::ok_with_message(
        DuesDefinitionResponse {
            definition: creation.definition,
            participants: request.participants,
        },
        format!("Dues created with {} invoices", creation.invoices_created),
    ))
}

/// GET /api/admin/dues
pub async fn list_dues(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<DuesDefinitionResponse>>>, ApiError> {
    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let definitions = DuesDefinition::list_for_cluster(&mut conn, auth_user.cluster_id).await?;

    let mut responses = Vec::with_capacity(definitions.len());
    for definition in definitions {
        let participants = definition.participant_ids(&mut conn).await?;
        responses.push(DuesDefinitionResponse {
            definition,
            participants,
        });
    }

    Ok(ApiResponse::ok(responses))
}

/// GET /api/admin/dues/{id}
pub async fn get_dues(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(definition_id): Path<Uuid>,
) -> Result<Json<ApiResponse<DuesDefinitionResponse>>, ApiError> {
    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let definition = DuesDefinition::find_by_id(&mut conn, definition_id)
        .await?
        .filter(|d| d.cluster_id == auth_user.cluster_id)
        .ok_or(ApiError::NotFound)?;

    let participants = definition.participant_ids(&mut conn).await?;

    Ok(ApiResponse::ok(DuesDefinitionResponse {
        definition,
        participants,
    }))
}

/// PUT /api/admin/dues/{id}/participants
pub async fn update_participants(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(definition_id): Path<Uuid>,
    Json(request): Json<UpdateParticipantsRequest>,
) -> Result<Json<ApiResponse<ParticipantUpdateResponse>>, ApiError> {
    request.validate()?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let definition = DuesDefinition::find_by_id(&mut conn, definition_id)
        .await?
        .filter(|d| d.cluster_id == auth_user.cluster_id)
        .ok_or(ApiError::NotFound)?;
    drop(conn);

    let sync = state
        .dues_service
        .sync_participants(&definition, &request.participants)
        .await?;

    queue_reminders(&state, &definition, sync.reminder_targets);

    Ok(ApiResponse::ok(ParticipantUpdateResponse {
        added: sync.added.len(),
        removed: sync.removed.len(),
        invoices_created: sync.invoices_created,
        invoices_deleted: sync.invoices_deleted,
    }))
}
