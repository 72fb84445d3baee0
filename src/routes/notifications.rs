use axum::extract::{Query, State};
use axum::response::Json;
use chrono::Utc;

use super::websites::UserParams;
use crate::dispatch::{EmailSubscription, NewSubscription};
use crate::error::DashboardError;
use crate::state::SharedState;

pub async fn subscribe(
    State(state): State<SharedState>,
    Json(body): Json<NewSubscription>,
) -> Result<Json<EmailSubscription>, DashboardError> {
    body.validate()?;
    state
        .db
        .get_website(body.website_id)
        .map_err(|e| DashboardError::Storage(e.to_string()))?
        .ok_or(DashboardError::WebsiteNotFound(body.website_id))?;

    let sub = state
        .db
        .create_subscription(&body, &Utc::now().to_rfc3339())
        .map_err(|e| DashboardError::Storage(e.to_string()))?;
    Ok(Json(sub))
}

pub async fn list_subscriptions(
    State(state): State<SharedState>,
    Query(params): Query<UserParams>,
) -> Json<Vec<EmailSubscription>> {
    match state.db.list_subscriptions(params.user_id) {
        Ok(subs) => Json(subs),
        Err(e) => {
            tracing::error!("Subscription listing failed: {}", e);
            Json(Vec::new())
        }
    }
}
