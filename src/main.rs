use axum::middleware::from_fn;
use axum::Router;
use dotenvy::dotenv;
use sqlx::PgPool;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod config;
mod db;
mod middleware;
mod utils;

use crate::api::activity::ActivityDoc;
use crate::api::auth::AuthDoc;
use crate::api::client::ClientDoc;
use crate::api::export::ExportDoc;
use crate::api::health::HealthDoc;
use crate::api::notification::NotificationDoc;
use crate::api::user::UserDoc;
use crate::config::Config;
use crate::middleware::auth::jwt_middleware;

#[tokio::main]
async fn main() {
    dotenv().ok();
    Config::init();

    std::fs::create_dir_all("logs").expect("Failed to create logs directory");
    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .with_ansi(false)
        .with_writer(non_blocking.and(std::io::stdout))
        .init();

    let pool = db::pool::get_db_pool().await;
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    let merged_doc = AuthDoc::openapi()
        .merge_from(ClientDoc::openapi())
        .merge_from(ActivityDoc::openapi())
        .merge_from(UserDoc::openapi())
        .merge_from(NotificationDoc::openapi())
        .merge_from(ExportDoc::openapi())
        .merge_from(HealthDoc::openapi());

    let public_routes = Router::new().merge(api::auth::auth_routes());

    let private_routes = Router::new()
        .merge(api::client::client_routes())
        .merge(api::activity::activity_routes())
        .merge(api::user::user_routes())
        .merge(api::notification::notification_routes())
        .merge(api::export::export_routes())
        .route_layer(from_fn(jwt_middleware));

    let app = Router::new()
        .merge(api::health::health_routes())
        .merge(public_routes)
        .merge(private_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", merged_doc))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(pool.clone());

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    run_server(app, shutdown_tx, pool).await;
    tracing::info!("Shutdown complete.");
}

async fn shutdown_signal(mut shutdown_rx: broadcast::Receiver<()>, pool: PgPool) {
    tokio::select! {
        _ = signal::ctrl_c() => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = shutdown_rx.recv() => tracing::info!("Received shutdown signal."),
    }
    tracing::info!("🛠️ Closing database pool...");
    pool.close().await;
    tracing::info!("✅ Database pool closed. Server shutting down.");
}

async fn run_server(app: Router, shutdown_tx: broadcast::Sender<()>, pool: PgPool) {
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!("Server running at http://{addr}");

    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");

    let shutdown = shutdown_signal(shutdown_tx.subscribe(), pool.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .expect("Server encountered an error");
}
