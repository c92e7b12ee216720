use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info, warn};

use pms_api::{build_router, AppState};
use pms_core::cache::{CacheStore, NoopCache};
use pms_core::notification::Mailer;
use pms_core::repositories::DocumentStore;
use pms_infrastructure::{
    create_pool, run_migrations, LocalAttachmentStorage, LogMailer, MailRenderer, MemoryDocumentStore,
    PgDocumentStore, RedisCache, SmtpMailer,
};
use pms_shared::config::{AppConfig, StoreDriver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize telemetry; the guard flushes file logs on exit
    let _log_guard = pms_shared::telemetry::init_telemetry(&config.log)?;
    install_panic_hook();

    info!("PMS Server starting ({})...", config.app.env);

    // Document store
    let store: Arc<dyn DocumentStore> = match config.database.driver {
        StoreDriver::Postgres => {
            info!("Connecting to database...");
            let pool = create_pool(&config.database).await?;
            run_migrations(&pool).await?;
            info!("Database connection established.");
            Arc::new(PgDocumentStore::new(pool))
        }
        StoreDriver::Memory => {
            warn!("Using in-memory document store; data is lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    // Cache
    let cache: Arc<dyn CacheStore> = if config.redis.enabled {
        info!("Using Redis cache at {}", config.redis.url);
        Arc::new(RedisCache::new(&config.redis)?)
    } else {
        info!("Redis disabled; responses are not cached");
        Arc::new(NoopCache)
    };

    // Mail
    let renderer = MailRenderer::new(&config.mail.from_name, &config.frontend.base_url)?;
    let mailer: Arc<dyn Mailer> = if config.mail.enabled {
        info!("Sending mail through {}:{}", config.mail.host, config.mail.port);
        Arc::new(SmtpMailer::new(&config.mail, renderer)?)
    } else {
        info!("Mail disabled; outgoing mail is logged only");
        Arc::new(LogMailer::new(renderer))
    };

    // Uploads
    tokio::fs::create_dir_all(&config.storage.upload_dir).await?;
    let storage = Arc::new(LocalAttachmentStorage::new(&config.storage));

    let cors = CorsLayer::new()
        .allow_origin(config.frontend.base_url.parse::<HeaderValue>()?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    let public_path = config.storage.public_path.clone();
    let upload_dir = config.storage.upload_dir.clone();

    let state = AppState::new(config, store, cache, mailer, storage);
    let app = build_router(state)
        .nest_service(&public_path, ServeDir::new(upload_dir))
        .layer(cors);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        error!("Panic: {}", panic);
        default_hook(panic);
    }));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
