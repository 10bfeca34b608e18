use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use attendance_tracker::{
    config::{Config, StorageBackend},
    db::init_db,
    docs::ApiDoc,
    routes,
    service::worker::seed_admin,
    store::{MemoryStore, MySqlStore, Store},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// The returned guard flushes the file writer on drop; keep it alive for the whole process.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    if config.log_stdout {
        tracing_subscriber::fmt()
            .with_max_level(config.log_level)
            .with_target(false)
            .init();
        return None;
    }

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Some(guard)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    let _guard = init_tracing(&config);

    info!(addr = %config.server_addr, storage = %config.storage, "Server starting...");

    let mut mysql = None;
    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the mysql backend")?;
            let pool = init_db(url, config.database_max_connections).await?;
            info!("Database connected and migrated");

            let store = MySqlStore::new(pool);
            mysql = Some(store.clone());
            Arc::new(store)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    match &config.admin_seed {
        Some(seed) => seed_admin(store.as_ref(), seed)
            .await
            .context("Failed to seed admin account")?,
        None => info!("No admin bootstrap configured"),
    }

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::from(store.clone()))
            .app_data(Data::new(config.clone()))
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    info!("Server stopped");
    if let Some(store) = mysql {
        store.close().await;
        info!("Database pool closed");
    }

    Ok(())
}
