// src/main.rs

use std::sync::Arc;

use dotenvy::dotenv;
use exam_interface::config::Config;
use exam_interface::routes;
use exam_interface::services::{http::HttpExamService, sweeper};
use exam_interface::state::AppState;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env().expect("Invalid configuration");

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let exam_service =
        HttpExamService::from_config(&config).expect("Failed to build exam service client");
    tracing::info!("Exam service at {}", config.exam_service_url);

    if !config.legacy_substring_match {
        tracing::info!("Legacy substring matching disabled, single-answer keys compare strictly");
    }

    let addr = config.bind_addr;
    let state = AppState::new(config, Arc::new(exam_service));

    // Drop sessions nobody has touched for a while
    tokio::spawn(sweeper::run(state.clone()));

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}
