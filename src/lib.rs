// Library crate for Skyport
// Exports modules for use by the reconciler binary and tests

pub mod cloud;
pub mod config;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod middlewares;
pub mod models;
pub mod plans;
pub mod repositories;
pub mod services;
pub mod state;
pub mod store;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{
    create_webapp, get_deployment_logs, get_deployment_status, get_webapp, health,
    list_database_types, list_frameworks, list_plans, list_regions, list_webapps, login, me,
    not_found, register, start_deployment,
};
use crate::middlewares::auth_middleware;
use crate::state::AppState;

/// Build the application router with the given state
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.frontend_url.as_deref());

    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .route("/api/auth/me", get(me))
        // Catalogue
        .route("/api/plans", get(list_plans))
        .route("/api/regions", get(list_regions))
        .route("/api/frameworks", get(list_frameworks))
        .route("/api/database-types", get(list_database_types))
        // Web apps
        .route("/api/webapps", post(create_webapp).get(list_webapps))
        .route("/api/webapps/{id}", get(get_webapp))
        // Deployments
        .route(
            "/api/deployments/{deployment_id}/start",
            post(start_deployment),
        )
        .route("/api/deployments/{deployment_id}", get(get_deployment_status))
        .route(
            "/api/deployments/{deployment_id}/logs",
            get(get_deployment_logs),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        // Public auth routes
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .merge(protected_routes)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Admit the configured frontend origin; without one no cross-origin access is granted
fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let Some(frontend_url) = frontend_url else {
        return CorsLayer::new();
    };

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
        Err(_) => {
            tracing::warn!(frontend_url, "Ignoring invalid FRONTEND_URL");
            CorsLayer::new()
        }
    }
}
