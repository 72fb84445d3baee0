use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::Utc;
use serde::Deserialize;

use super::websites::LimitParams;
use crate::analysis::{self, PerformanceReport, ANALYSIS_REPORT_TYPE};
use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::error::DashboardError;
use crate::metrics::{self, IngestOutcome, MetricSample, NewSample};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct AnalysisRequest {
    pub limit: Option<i64>,
}

/// Ingestion endpoint. The raw sample is durably persisted before any
/// evaluation happens.
pub async fn record_metric(
    State(state): State<SharedState>,
    Json(body): Json<NewSample>,
) -> Result<Json<IngestOutcome>, DashboardError> {
    let outcome = metrics::ingest(&state.db, &body, &state.policy, &Utc::now().to_rfc3339())?;
    Ok(Json(outcome))
}

pub async fn metric_history(
    State(state): State<SharedState>,
    Path(website_id): Path<i64>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<MetricSample>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state.db.list_samples(website_id, limit) {
        Ok(samples) => Json(samples),
        Err(e) => {
            tracing::error!("Metric history query failed: {}", e);
            Json(Vec::new())
        }
    }
}

pub async fn generate_analysis(
    State(state): State<SharedState>,
    Path(website_id): Path<i64>,
    Json(body): Json<AnalysisRequest>,
) -> Result<Json<PerformanceReport>, DashboardError> {
    let llm = state.llm.as_ref().ok_or(DashboardError::LlmNotConfigured)?;
    let limit = body.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let report = analysis::generate_analysis(
        &state.db,
        llm,
        website_id,
        limit,
        &Utc::now().to_rfc3339(),
    )
    .await?;
    Ok(Json(report))
}

pub async fn latest_analysis(
    State(state): State<SharedState>,
    Path(website_id): Path<i64>,
) -> Json<Option<PerformanceReport>> {
    match state.db.latest_report(website_id, ANALYSIS_REPORT_TYPE) {
        Ok(report) => Json(report),
        Err(e) => {
            tracing::error!("Latest report query failed: {}", e);
            Json(None)
        }
    }
}
