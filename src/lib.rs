// Library exports for KomplekIn Backend

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use db::{DieselPool, MIGRATIONS};
pub use middleware::{auth_middleware, require_admin, AuthenticatedUser};
pub use services::{
    AccessTokenClaims, DuesService, EmailService, JwtConfig, JwtError, JwtService, PaymentService,
    StorageService, TokenService,
};
pub use utils::{ApiError, ApiResponse};

pub use handlers::{admin_routes, auth_routes, user_routes};

// Library initialization for the binary and integration harnesses
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    use std::sync::Arc;
    use tracing::info;

    dotenv::dotenv().ok();

    let config = app_config::config();

    info!("Initializing database pool...");
    let db_config = db::DieselDatabaseConfig::default();
    let max_connections = db_config.max_connections;
    let diesel_pool = db::create_diesel_pool(db_config).await?;

    if migrations::should_run_migrations() {
        info!("Running embedded migrations...");
        migrations::run_all_migrations(&diesel_pool)
            .await
            .map_err(|e| format!("Migration failed: {}", e))?;
    }

    let jwt_service = Arc::new(JwtService::new(services::JwtConfig::from_env()));
    let token_service = Arc::new(TokenService::new(diesel_pool.clone()));
    let dues_service = Arc::new(DuesService::new(diesel_pool.clone()));
    let payment_service = Arc::new(PaymentService::new(diesel_pool.clone()));
    let email_service = Arc::new(EmailService::new(config.email.clone())?);
    let storage_service = Arc::new(StorageService::new());

    Ok(AppState {
        diesel_pool,
        jwt_service,
        token_service,
        dues_service,
        payment_service,
        email_service,
        storage_service,
        max_connections,
    })
}

/// Full API router with auth gating on /api/user and /api/admin
pub fn api_router(state: AppState) -> axum::Router {
    use axum::http::{header, HeaderValue, Method};
    use axum::middleware as axum_middleware;
    use axum::routing::get;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    let frontend_origin = app_config::config().email.frontend_url.clone();
    let cors = match frontend_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        Err(_) => CorsLayer::new(),
    };

    let protected_user = handlers::user_routes().layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::auth_middleware,
    ));

    let protected_admin = handlers::admin_routes()
        .layer(axum_middleware::from_fn(middleware::require_admin))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    axum::Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", handlers::auth_routes())
        .nest("/api/user", protected_user)
        .nest("/api/admin", protected_admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Health check handler
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    use axum::http::StatusCode;
    use axum::Json;

    let timestamp = chrono::Utc::now().to_rfc3339();

    let (postgres_healthy, postgres_health) =
        match db::check_diesel_health(&state.diesel_pool).await {
            Ok(_) => (
                true,
                serde_json::json!({
                    "status": "healthy",
                    "max_connections": state.max_connections,
                    "error": null
                }),
            ),
            Err(e) => (
                false,
                serde_json::json!({
                    "status": "unhealthy",
                    "error": format!("Database connection failed: {}", e)
                }),
            ),
        };

    // An unreachable email provider degrades the service but does not
    // take it down; only the database gates the status code.
    let (email_healthy, email_health) = match state.email_service.health_check().await {
        Ok(_) => (true, serde_json::json!({ "status": "healthy", "error": null })),
        Err(e) => (
            false,
            serde_json::json!({
                "status": "unhealthy",
                "error": format!("Email provider unreachable: {}", e)
            }),
        ),
    };

    let response = serde_json::json!({
        "status": if postgres_healthy && email_healthy { "healthy" } else { "degraded" },
        "service": "komplekin-backend",
        "timestamp": timestamp,
        "components": {
            "postgresql": postgres_health,
            "email": email_health
        }
    });

    if postgres_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
