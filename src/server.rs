use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(crate::routes::health::health))
        // Websites
        .route(
            "/websites",
            post(crate::routes::websites::create_website)
                .get(crate::routes::websites::list_websites),
        )
        .route(
            "/websites/{id}/deactivate",
            post(crate::routes::websites::deactivate_website),
        )
        // Metrics
        .route(
            "/metrics/record",
            post(crate::routes::metrics::record_metric),
        )
        .route(
            "/websites/{id}/metrics",
            get(crate::routes::metrics::metric_history),
        )
        // Alert rules and events
        .route(
            "/websites/{id}/alerts",
            post(crate::routes::websites::create_rule).get(crate::routes::websites::list_rules),
        )
        .route(
            "/websites/{id}/alert-events",
            get(crate::routes::websites::list_alert_events),
        )
        // LLM analysis
        .route(
            "/websites/{id}/analysis",
            post(crate::routes::metrics::generate_analysis),
        )
        .route(
            "/websites/{id}/analysis/latest",
            get(crate::routes::metrics::latest_analysis),
        )
        // Email digests
        .route(
            "/subscriptions",
            post(crate::routes::notifications::subscribe)
                .get(crate::routes::notifications::list_subscriptions),
        )
        .layer(cors)
        .with_state(state)
}
