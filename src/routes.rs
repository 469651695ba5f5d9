// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, api, auth, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (quiz, admin, read-only api).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, admin credential).
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so
/// the IP gate can see peer addresses.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().expect("valid origin"),
            "http://127.0.0.1:3000".parse().expect("valid origin"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let quiz_routes = Router::new()
        .route("/", get(quiz::start_quiz))
        .route("/status", get(quiz::status))
        .route("/submit", post(quiz::submit_quiz))
        .route("/completed", get(quiz::completed))
        .route("/results/{id}", get(quiz::get_result));

    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route(
            "/upload",
            post(admin::upload_questions)
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route("/clear", post(admin::clear_all))
        .route("/export", get(admin::export_csv))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // Login stays outside the protected layers
        .route("/login", post(auth::login));

    let api_routes = Router::new()
        .route("/questions", get(api::list_questions))
        .route("/stats", get(api::quick_stats));

    Router::new()
        .nest("/api/quiz", quiz_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
