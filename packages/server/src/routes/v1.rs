use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/bands", band_routes())
        .route("/members/{id}", delete(handlers::deletion::delete_member))
        .nest("/events", event_routes())
        .nest("/posts", post_routes())
        .route("/comments/{id}", delete(handlers::deletion::delete_comment))
        .nest("/admin", admin_routes())
}

fn band_routes() -> Router<AppState> {
    Router::new()
        .route("/batch-delete", post(handlers::deletion::batch_delete_bands))
        .route("/{id}", delete(handlers::deletion::delete_band))
}

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/batch-delete", post(handlers::deletion::batch_delete_events))
        .route("/{id}", delete(handlers::deletion::delete_event))
}

fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/batch-delete", post(handlers::deletion::batch_delete_posts))
        .route("/{id}", delete(handlers::deletion::delete_post))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users/batch-delete", post(handlers::admin::batch_delete_users))
        .route("/users/{id}", delete(handlers::admin::delete_user))
        .route("/cleanup", post(handlers::cleanup::run_cleanup))
        .route("/cleanup/status", get(handlers::cleanup::cleanup_status))
}
