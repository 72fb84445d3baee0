use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::alerts::{AlertEvent, AlertRule, MetricKind};
use crate::config::DEFAULT_EVENT_LIMIT;
use crate::decimal::Decimal;
use crate::error::DashboardError;
use crate::state::SharedState;
use crate::websites::{NewWebsite, Website};

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserParams {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRuleBody {
    pub metric_type: MetricKind,
    pub threshold_value: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub ok: bool,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_website(
    State(state): State<SharedState>,
    Json(body): Json<NewWebsite>,
) -> Result<Json<Website>, DashboardError> {
    body.validate()?;
    let site = state
        .db
        .create_website(&body, &Utc::now().to_rfc3339())
        .map_err(|e| DashboardError::Storage(e.to_string()))?;
    Ok(Json(site))
}

pub async fn list_websites(
    State(state): State<SharedState>,
    Query(params): Query<UserParams>,
) -> Json<Vec<Website>> {
    match state.db.list_websites(params.user_id) {
        Ok(sites) => Json(sites),
        Err(e) => {
            tracing::error!("Website listing failed: {}", e);
            Json(Vec::new())
        }
    }
}

pub async fn deactivate_website(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, DashboardError> {
    let changed = state
        .db
        .set_website_active(id, false, &Utc::now().to_rfc3339())
        .map_err(|e| DashboardError::Storage(e.to_string()))?;
    if !changed {
        return Err(DashboardError::WebsiteNotFound(id));
    }
    Ok(Json(MessageResponse {
        ok: true,
        message: format!("Website {id} deactivated"),
    }))
}

pub async fn create_rule(
    State(state): State<SharedState>,
    Path(website_id): Path<i64>,
    Json(body): Json<NewRuleBody>,
) -> Result<Json<AlertRule>, DashboardError> {
    body.threshold_value.parse::<Decimal>().map_err(|e| {
        DashboardError::validation(format!("thresholdValue is not a valid decimal: {e}"))
    })?;
    state
        .db
        .get_website(website_id)
        .map_err(|e| DashboardError::Storage(e.to_string()))?
        .ok_or(DashboardError::WebsiteNotFound(website_id))?;

    let rule = state
        .db
        .create_rule(
            website_id,
            body.metric_type,
            body.threshold_value.trim(),
            &Utc::now().to_rfc3339(),
        )
        .map_err(|e| DashboardError::Storage(e.to_string()))?;
    Ok(Json(rule))
}

pub async fn list_rules(
    State(state): State<SharedState>,
    Path(website_id): Path<i64>,
) -> Json<Vec<AlertRule>> {
    match state.db.list_rules(website_id) {
        Ok(rules) => Json(rules),
        Err(e) => {
            tracing::error!("Rule listing failed: {}", e);
            Json(Vec::new())
        }
    }
}

pub async fn list_alert_events(
    State(state): State<SharedState>,
    Path(website_id): Path<i64>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<AlertEvent>> {
    let limit = params.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    match state.db.recent_events(website_id, limit) {
        Ok(events) => Json(events),
        Err(e) => {
            tracing::error!("Alert event listing failed: {}", e);
            Json(Vec::new())
        }
    }
}
