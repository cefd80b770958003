// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{health, session},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Mounts the public health probe and the protected test-interface routes.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Every learner route needs a verified token
    let learner_routes = Router::new()
        .route("/exams/{exam_id}/sessions", post(session::start_session))
        .route(
            "/sessions/{session_id}",
            get(session::get_session).delete(session::end_session),
        )
        .route(
            "/sessions/{session_id}/answers/{question_id}",
            put(session::save_answer),
        )
        .route("/sessions/{session_id}/submit", post(session::submit_session))
        .route("/sessions/{session_id}/results", get(session::get_results))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = Router::new()
        .route("/health", get(health::health))
        .merge(learner_routes);

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
