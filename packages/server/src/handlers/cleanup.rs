use axum::{Json, extract::State};
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::lifecycle::CleanupScheduler;
use crate::models::cleanup::{
    CleanupMode, CleanupReportResponse, CleanupStatusResponse, RunCleanupRequest,
};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/admin/cleanup",
    tag = "Admin",
    operation_id = "runCleanup",
    summary = "Run a cleanup pass",
    description = "Runs the maintenance pass synchronously. `full` runs every database step and sweeps every media bucket, `quick` skips media entirely and `files` only sweeps media. Step failures are reported in the body; the call itself still succeeds. Requires `cleanup:run` permission.",
    request_body = RunCleanupRequest,
    responses(
        (status = 200, description = "Cleanup report", body = CleanupReportResponse),
        (status = 400, description = "Invalid mode (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn run_cleanup(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RunCleanupRequest>,
) -> Result<Json<CleanupReportResponse>, AppError> {
    auth_user.require_permission("cleanup:run")?;

    info!(mode = ?payload.mode, by = auth_user.user_id, "Manual cleanup requested");
    let scheduler = CleanupScheduler::new(
        &state.db,
        state.media_store.as_ref(),
        &state.config.cleanup,
    );
    let report = match payload.mode {
        CleanupMode::Full => scheduler.run_full().await,
        CleanupMode::Quick => scheduler.run_quick().await,
        CleanupMode::Files => scheduler.run_files().await,
    };

    Ok(Json(CleanupReportResponse::from(&report)))
}

#[utoipa::path(
    get,
    path = "/admin/cleanup/status",
    tag = "Admin",
    operation_id = "getCleanupStatus",
    summary = "Inspect the cleanup backlog",
    description = "Counts what a cleanup pass would remove, plus row totals per table. Read-only. Requires `cleanup:view` permission.",
    responses(
        (status = 200, description = "Cleanup backlog", body = CleanupStatusResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn cleanup_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CleanupStatusResponse>, AppError> {
    auth_user.require_permission("cleanup:view")?;

    let status = CleanupScheduler::new(
        &state.db,
        state.media_store.as_ref(),
        &state.config.cleanup,
    )
    .status()
    .await?;

    Ok(Json(CleanupStatusResponse::from(status)))
}
