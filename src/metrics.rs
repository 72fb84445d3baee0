//! Metric ingestion: validate a Core Web Vitals sample, persist it, then
//! run it through the alert pipeline.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::alerts::{evaluator, recorder, AlertEventDelta, MetricKind, SeverityPolicy};
use crate::db::DashboardDb;
use crate::decimal::Decimal;
use crate::error::DashboardError;

/// A stored sample. Any subset of the metric fields may be present; absent
/// fields are `None`, never a zero sentinel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub id: i64,
    pub website_id: i64,
    /// Largest Contentful Paint, milliseconds.
    pub lcp: Option<i64>,
    /// First Input Delay, milliseconds.
    pub fid: Option<i64>,
    /// Cumulative Layout Shift, decimal string.
    pub cls: Option<String>,
    pub lighthouse_score: Option<i64>,
    pub performance_score: Option<i64>,
    pub recorded_at: String,
}

impl MetricSample {
    /// The sample's value for `kind`, as an exact decimal. `None` when the
    /// field is absent, or when a stored `cls` string no longer parses,
    /// which is treated as absent rather than a breach.
    pub fn value_of(&self, kind: MetricKind) -> Option<Decimal> {
        match kind {
            MetricKind::Lcp => self.lcp.and_then(Decimal::from_int),
            MetricKind::Fid => self.fid.and_then(Decimal::from_int),
            MetricKind::Cls => self.cls.as_deref().and_then(|s| s.parse().ok()),
            MetricKind::LighthouseScore => self.lighthouse_score.and_then(Decimal::from_int),
        }
    }
}

/// Unvalidated ingestion payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSample {
    pub website_id: i64,
    pub lcp: Option<i64>,
    pub fid: Option<i64>,
    pub cls: Option<String>,
    pub lighthouse_score: Option<i64>,
    pub performance_score: Option<i64>,
}

impl NewSample {
    pub fn validate(&self) -> Result<(), DashboardError> {
        if let Some(lcp) = self.lcp {
            if lcp < 0 {
                return Err(DashboardError::validation("lcp must be >= 0"));
            }
        }
        if let Some(fid) = self.fid {
            if fid < 0 {
                return Err(DashboardError::validation("fid must be >= 0"));
            }
        }
        if let Some(cls) = &self.cls {
            cls.parse::<Decimal>().map_err(|e| {
                DashboardError::validation(format!("cls is not a valid decimal: {e}"))
            })?;
        }
        for (name, score) in [
            ("lighthouseScore", self.lighthouse_score),
            ("performanceScore", self.performance_score),
        ] {
            if let Some(v) = score {
                if !(0..=100).contains(&v) {
                    return Err(DashboardError::validation(format!(
                        "{name} must be between 0 and 100"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub sample: MetricSample,
    pub deltas: Vec<AlertEventDelta>,
}

/// Persist a sample and run the evaluate/record pipeline for its website.
///
/// The raw sample is written first and survives regardless of what the
/// alert pipeline does; an evaluation failure after that point is logged
/// and reported, never a silent drop of the sample.
pub fn ingest(
    db: &DashboardDb,
    input: &NewSample,
    policy: &SeverityPolicy,
    now: &str,
) -> Result<IngestOutcome, DashboardError> {
    input.validate()?;

    let website = db
        .get_website(input.website_id)
        .map_err(|e| DashboardError::Storage(e.to_string()))?
        .ok_or(DashboardError::WebsiteNotFound(input.website_id))?;

    let sample = db
        .insert_sample(input, now)
        .map_err(|e| DashboardError::Storage(e.to_string()))?;

    let rules = match db.active_rules(website.id) {
        Ok(rules) => rules,
        Err(e) => {
            // Sample is already durable; degrade to "no rules" rather than
            // failing the ingest.
            warn!("Failed to load alert rules for website {}: {}", website.id, e);
            Vec::new()
        }
    };

    let results = evaluator::evaluate(&sample, &rules, policy);
    let deltas = recorder::apply(db, website.id, &results, now)
        .map_err(|e| DashboardError::Storage(e.to_string()))?;

    Ok(IngestOutcome { sample, deltas })
}
