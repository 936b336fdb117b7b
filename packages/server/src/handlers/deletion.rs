use axum::{
    Json,
    extract::{Path, State},
};
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::lifecycle::{
    BatchDeletion, CascadeDeleter, EntityKind, EntityRef, LifecycleError, store,
};
use crate::models::deletion::{BatchDeletionResponse, DeletionResponse};
use crate::models::shared::{BatchDeleteRequest, MAX_BATCH_IDS, validate_bulk_ids};
use crate::state::AppState;

/// Owner of the row, or a holder of `<kind>:delete_any`.
async fn authorize(
    state: &AppState,
    auth_user: &AuthUser,
    target: EntityRef,
) -> Result<(), LifecycleError> {
    let owner = store::owner_of(&state.db, target)
        .await?
        .ok_or(LifecycleError::NotFound(target))?;
    if auth_user.can_delete_any(target.kind) || owner == Some(auth_user.user_id) {
        Ok(())
    } else {
        Err(LifecycleError::Unauthorized(target))
    }
}

pub(crate) async fn delete_one(
    state: &AppState,
    auth_user: &AuthUser,
    target: EntityRef,
) -> Result<DeletionResponse, AppError> {
    authorize(state, auth_user, target).await?;

    let result = CascadeDeleter::new(&state.db, state.media_store.as_ref())
        .delete(target)
        .await?;

    info!(
        entity = %target,
        by = auth_user.user_id,
        rows = result.total_deleted(),
        files = result.reclaimed.len(),
        "Entity deleted"
    );
    Ok(DeletionResponse::from(&result))
}

/// Unauthorized items are rejected up front; the rest are deleted one by one.
pub(crate) async fn delete_batch(
    state: &AppState,
    auth_user: &AuthUser,
    kind: EntityKind,
    ids: &[i32],
) -> Result<BatchDeletionResponse, AppError> {
    validate_bulk_ids(ids, "ids", MAX_BATCH_IDS)?;

    let mut batch = BatchDeletion::default();
    let mut allowed = Vec::with_capacity(ids.len());
    for &id in ids {
        let target = EntityRef::new(kind, id);
        match authorize(state, auth_user, target).await {
            Ok(()) => allowed.push(target),
            Err(e) => batch.reject(target, e),
        }
    }

    let done = CascadeDeleter::new(&state.db, state.media_store.as_ref())
        .delete_many(&allowed)
        .await;
    batch.results.extend(done.results);
    batch.not_found.extend(done.not_found);
    batch.failures.extend(done.failures);

    info!(
        kind = %kind,
        by = auth_user.user_id,
        requested = ids.len(),
        deleted = batch.results.len(),
        not_found = batch.not_found.len(),
        failed = batch.failures.len(),
        "Batch deletion finished"
    );
    Ok(BatchDeletionResponse::from(&batch))
}

#[utoipa::path(
    delete,
    path = "/bands/{id}",
    tag = "Deletion",
    operation_id = "deleteBand",
    summary = "Delete a band",
    description = "Deletes the band with its members and events, then reclaims their media. Requires ownership or `band:delete_any`.",
    params(("id" = i32, Path, description = "Band ID")),
    responses(
        (status = 200, description = "Band deleted", body = DeletionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Band not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_band(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeletionResponse>, AppError> {
    let target = EntityRef::new(EntityKind::Band, id);
    Ok(Json(delete_one(&state, &auth_user, target).await?))
}

#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "Deletion",
    operation_id = "deleteMember",
    summary = "Delete a band member",
    description = "Deletes the member and reclaims its avatar. Requires ownership or `member:delete_any`.",
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member deleted", body = DeletionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Member not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_member(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeletionResponse>, AppError> {
    let target = EntityRef::new(EntityKind::Member, id);
    Ok(Json(delete_one(&state, &auth_user, target).await?))
}

#[utoipa::path(
    delete,
    path = "/events/{id}",
    tag = "Deletion",
    operation_id = "deleteEvent",
    summary = "Delete an event",
    description = "Deletes the event and reclaims its poster. Requires ownership or `event:delete_any`.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event deleted", body = DeletionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeletionResponse>, AppError> {
    let target = EntityRef::new(EntityKind::Event, id);
    Ok(Json(delete_one(&state, &auth_user, target).await?))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}",
    tag = "Deletion",
    operation_id = "deletePost",
    summary = "Delete a post",
    description = "Deletes the post with its comments, likes and reports, then reclaims its images. Requires ownership or `post:delete_any`.",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post deleted", body = DeletionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeletionResponse>, AppError> {
    let target = EntityRef::new(EntityKind::Post, id);
    Ok(Json(delete_one(&state, &auth_user, target).await?))
}

#[utoipa::path(
    delete,
    path = "/comments/{id}",
    tag = "Deletion",
    operation_id = "deleteComment",
    summary = "Delete a comment",
    description = "Deletes the comment with its replies, likes and reports. Requires ownership or `comment:delete_any`.",
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment deleted", body = DeletionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeletionResponse>, AppError> {
    let target = EntityRef::new(EntityKind::Comment, id);
    Ok(Json(delete_one(&state, &auth_user, target).await?))
}

#[utoipa::path(
    post,
    path = "/bands/batch-delete",
    tag = "Deletion",
    operation_id = "batchDeleteBands",
    summary = "Delete several bands",
    description = "Deletes each band independently. Items that are missing, not owned by the caller or fail are reported per id without affecting the others.",
    request_body = BatchDeleteRequest,
    responses(
        (status = 200, description = "Per-item breakdown", body = BatchDeletionResponse),
        (status = 400, description = "Invalid id list (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn batch_delete_bands(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BatchDeleteRequest>,
) -> Result<Json<BatchDeletionResponse>, AppError> {
    let response = delete_batch(&state, &auth_user, EntityKind::Band, &payload.ids).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/events/batch-delete",
    tag = "Deletion",
    operation_id = "batchDeleteEvents",
    summary = "Delete several events",
    description = "Deletes each event independently and reports the outcome per id.",
    request_body = BatchDeleteRequest,
    responses(
        (status = 200, description = "Per-item breakdown", body = BatchDeletionResponse),
        (status = 400, description = "Invalid id list (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn batch_delete_events(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BatchDeleteRequest>,
) -> Result<Json<BatchDeletionResponse>, AppError> {
    let response = delete_batch(&state, &auth_user, EntityKind::Event, &payload.ids).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/posts/batch-delete",
    tag = "Deletion",
    operation_id = "batchDeletePosts",
    summary = "Delete several posts",
    description = "Deletes each post independently and reports the outcome per id.",
    request_body = BatchDeleteRequest,
    responses(
        (status = 200, description = "Per-item breakdown", body = BatchDeletionResponse),
        (status = 400, description = "Invalid id list (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn batch_delete_posts(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BatchDeleteRequest>,
) -> Result<Json<BatchDeletionResponse>, AppError> {
    let response = delete_batch(&state, &auth_user, EntityKind::Post, &payload.ids).await?;
    Ok(Json(response))
}
