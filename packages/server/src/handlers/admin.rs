use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::lifecycle::{EntityKind, EntityRef};
use crate::models::deletion::{BatchDeletionResponse, DeletionResponse};
use crate::models::shared::BatchDeleteRequest;
use crate::state::AppState;

use super::deletion::{delete_batch, delete_one};

#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "Admin",
    operation_id = "deleteUser",
    summary = "Delete a user account",
    description = "Deletes the account and everything it owns: bands with their members and events, posts, comments, likes and reports. Media of every deleted row is reclaimed. Requires `user:delete` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = DeletionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeletionResponse>, AppError> {
    auth_user.require_permission("user:delete")?;

    let target = EntityRef::new(EntityKind::User, id);
    Ok(Json(delete_one(&state, &auth_user, target).await?))
}

#[utoipa::path(
    post,
    path = "/admin/users/batch-delete",
    tag = "Admin",
    operation_id = "batchDeleteUsers",
    summary = "Delete several user accounts",
    description = "Deletes each account independently with its full subtree. Requires `user:delete` permission.",
    request_body = BatchDeleteRequest,
    responses(
        (status = 200, description = "Per-item breakdown", body = BatchDeletionResponse),
        (status = 400, description = "Invalid id list (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn batch_delete_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BatchDeleteRequest>,
) -> Result<Json<BatchDeletionResponse>, AppError> {
    auth_user.require_permission("user:delete")?;

    let response = delete_batch(&state, &auth_user, EntityKind::User, &payload.ids).await?;
    Ok(Json(response))
}
