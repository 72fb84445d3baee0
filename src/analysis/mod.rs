//! On-demand LLM performance analysis: aggregate recent samples, ask the
//! model for recommendations, store the report verbatim.

pub mod llm;

use serde::Serialize;

use crate::db::DashboardDb;
use crate::error::DashboardError;
use crate::metrics::MetricSample;
use llm::LlmClient;

pub const ANALYSIS_REPORT_TYPE: &str = "analysis";

const ANALYST_SYSTEM_PROMPT: &str = "You are an expert web performance analyst. \
Provide concise, actionable recommendations for improving Core Web Vitals metrics.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub id: i64,
    pub website_id: i64,
    pub report_type: String,
    pub summary: Option<String>,
    /// JSON blob of the aggregates the analysis was based on.
    pub metrics: Option<String>,
    /// LLM output, stored verbatim and never parsed for control flow.
    pub recommendations: Option<String>,
    pub created_at: String,
}

/// Averages over the fields present in a sample window. Display-only,
/// breach decisions never touch these.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAggregates {
    pub avg_lcp: Option<f64>,
    pub avg_fid: Option<f64>,
    pub avg_lighthouse: Option<f64>,
    pub avg_performance: Option<f64>,
    pub sample_count: usize,
}

pub fn aggregate(samples: &[MetricSample]) -> MetricAggregates {
    fn average(values: impl Iterator<Item = i64>) -> Option<f64> {
        let values: Vec<i64> = values.collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
    }

    MetricAggregates {
        avg_lcp: average(samples.iter().filter_map(|s| s.lcp)),
        avg_fid: average(samples.iter().filter_map(|s| s.fid)),
        avg_lighthouse: average(samples.iter().filter_map(|s| s.lighthouse_score)),
        avg_performance: average(samples.iter().filter_map(|s| s.performance_score)),
        sample_count: samples.len(),
    }
}

pub fn build_analysis_prompt(agg: &MetricAggregates) -> String {
    fn line(label: &str, value: Option<f64>, unit: &str) -> String {
        match value {
            Some(v) => format!("Average {label}: {v:.0}{unit}\n"),
            None => format!("Average {label}: no data\n"),
        }
    }

    format!(
        "Analyze these Core Web Vitals metrics and provide optimization recommendations:\n\n\
         {}{}{}{}\n\
         Provide specific, actionable recommendations to improve these metrics.",
        line("LCP", agg.avg_lcp, "ms"),
        line("FID", agg.avg_fid, "ms"),
        line("Lighthouse Score", agg.avg_lighthouse, "/100"),
        line("Performance Score", agg.avg_performance, "/100"),
    )
}

/// Aggregate the website's most recent samples, request recommendations,
/// and persist the resulting report.
pub async fn generate_analysis(
    db: &DashboardDb,
    llm: &LlmClient,
    website_id: i64,
    limit: i64,
    now: &str,
) -> Result<PerformanceReport, DashboardError> {
    let website = db
        .get_website(website_id)
        .map_err(|e| DashboardError::Storage(e.to_string()))?
        .ok_or(DashboardError::WebsiteNotFound(website_id))?;

    let samples = db
        .list_samples(website.id, limit)
        .map_err(|e| DashboardError::Storage(e.to_string()))?;
    if samples.is_empty() {
        return Err(DashboardError::validation(
            "no metric samples recorded for this website",
        ));
    }

    let agg = aggregate(&samples);
    let prompt = build_analysis_prompt(&agg);

    let recommendations = llm
        .summarize(ANALYST_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| DashboardError::Llm(e.to_string()))?;

    let metrics_json =
        serde_json::to_string(&agg).map_err(|e| DashboardError::Other(e.to_string()))?;
    let summary = format!("Analysis of {} metric samples", agg.sample_count);

    db.insert_report(
        website.id,
        ANALYSIS_REPORT_TYPE,
        Some(&summary),
        Some(&metrics_json),
        Some(&recommendations),
        now,
    )
    .map_err(|e| DashboardError::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(lcp: Option<i64>, lighthouse: Option<i64>) -> MetricSample {
        MetricSample {
            id: 0,
            website_id: 1,
            lcp,
            fid: None,
            cls: None,
            lighthouse_score: lighthouse,
            performance_score: None,
            recorded_at: "2026-08-30T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_aggregate_averages_present_fields_only() {
        let samples = vec![
            sample(Some(2000), Some(90)),
            sample(Some(4000), None),
            sample(None, Some(70)),
        ];
        let agg = aggregate(&samples);
        assert_eq!(agg.avg_lcp, Some(3000.0));
        assert_eq!(agg.avg_lighthouse, Some(80.0));
        assert_eq!(agg.avg_fid, None);
        assert_eq!(agg.sample_count, 3);
    }

    #[test]
    fn test_aggregate_empty_window() {
        let agg = aggregate(&[]);
        assert_eq!(agg.avg_lcp, None);
        assert_eq!(agg.sample_count, 0);
    }

    #[test]
    fn test_prompt_mentions_aggregates() {
        let agg = aggregate(&[sample(Some(2500), Some(85))]);
        let prompt = build_analysis_prompt(&agg);
        assert!(prompt.contains("Average LCP: 2500ms"));
        assert!(prompt.contains("Average Lighthouse Score: 85/100"));
        assert!(prompt.contains("Average FID: no data"));
    }
}
