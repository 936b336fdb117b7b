use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::MediaStore;
use common::storage::filesystem::FilesystemMediaStore;
use tracing::{Level, info};

use bandhub::config::AppConfig;
use bandhub::database::init_db;
use bandhub::lifecycle::run_cleanup_scheduler;
use bandhub::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    let media_store: Arc<dyn MediaStore> = Arc::new(FilesystemMediaStore::new(
        config.storage.upload_dir.clone(),
        Duration::from_secs(config.storage.io_timeout_secs),
    ));

    if config.cleanup.enabled {
        tokio::spawn(run_cleanup_scheduler(
            db.clone(),
            media_store.clone(),
            config.cleanup.clone(),
        ));
    } else {
        info!("Periodic cleanup disabled");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        config,
        media_store,
    };
    let app = bandhub::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
