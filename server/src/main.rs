use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use cinema_server::auth::PasswordHasher;
use cinema_server::config::{Config, StoreBackend};
use cinema_server::payment::{HttpPaymentGateway, MockPaymentGateway, PaymentGateway};
use cinema_server::routes::create_routes;
use cinema_server::state::AppState;
use cinema_server::storage::{FileStorage, LocalFileStorage, PHOTOS, THUMBNAILS};
use cinema_server::store::{MemoryStore, PgStore, Stores};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cinema_server=debug,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    if let Err(reason) = config.check_production() {
        tracing::error!(%reason, "Refusing to start");
        std::process::exit(1);
    }

    let stores = match config.store {
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(&config.database_url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Successfully connected to database");

            sqlx::migrate!()
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Migrations run successfully");
            Stores::shared(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Stores::shared(Arc::new(MemoryStore::new()))
        }
    };

    for folder in [THUMBNAILS, PHOTOS] {
        tokio::fs::create_dir_all(config.upload_dir.join(folder))
            .await
            .expect("Failed to create upload directories");
    }
    let files: Arc<dyn FileStorage> =
        Arc::new(LocalFileStorage::new(&config.upload_dir, &config.app_url));

    let gateway: Arc<dyn PaymentGateway> = if config.payment.server_key.is_empty() {
        tracing::warn!(
            "PAYMENT_SERVER_KEY not set, top-ups use the mock gateway and notifications are refused"
        );
        Arc::new(MockPaymentGateway::new())
    } else {
        Arc::new(HttpPaymentGateway::new(&config.payment).expect("Failed to build payment client"))
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("HOST and PORT must form a socket address");

    let state = AppState::new(config, stores, files, gateway, PasswordHasher::default());
    let app = create_routes(state);

    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
