pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BandHub Lifecycle API",
        version = "1.0.0",
        description = "Cascading deletion and orphan cleanup for the BandHub community platform"
    ),
    paths(
        handlers::deletion::delete_band,
        handlers::deletion::delete_member,
        handlers::deletion::delete_event,
        handlers::deletion::delete_post,
        handlers::deletion::delete_comment,
        handlers::deletion::batch_delete_bands,
        handlers::deletion::batch_delete_events,
        handlers::deletion::batch_delete_posts,
        handlers::admin::delete_user,
        handlers::admin::batch_delete_users,
        handlers::cleanup::run_cleanup,
        handlers::cleanup::cleanup_status,
    ),
    servers((url = "/api/v1")),
    tags(
        (name = "Deletion", description = "Deleting owned content with its descendants and media"),
        (name = "Admin", description = "Account removal and maintenance passes"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    axum::Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state)
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .layer(cors)
}
