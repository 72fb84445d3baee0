pub mod evaluator;
pub mod recorder;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metric a rule watches. Direction is metric-dependent: `lighthouseScore`
/// degrades downward, the rest degrade upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Lcp,
    Fid,
    Cls,
    LighthouseScore,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Lcp => "lcp",
            MetricKind::Fid => "fid",
            MetricKind::Cls => "cls",
            MetricKind::LighthouseScore => "lighthouseScore",
        }
    }

    /// True when a breach means "value fell below the threshold".
    pub fn lower_is_worse(&self) -> bool {
        matches!(self, MetricKind::LighthouseScore)
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lcp" => Ok(MetricKind::Lcp),
            "fid" => Ok(MetricKind::Fid),
            "cls" => Ok(MetricKind::Cls),
            "lighthouseScore" => Ok(MetricKind::LighthouseScore),
            _ => Err(format!("unknown metric type: {s}")),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Green,
    Yellow,
    Red,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Green => "green",
            Severity::Yellow => "yellow",
            Severity::Red => "red",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "green" => Ok(Severity::Green),
            "yellow" => Ok(Severity::Yellow),
            "red" => Ok(Severity::Red),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured threshold rule, as stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub id: i64,
    pub website_id: i64,
    pub metric_type: MetricKind,
    pub threshold_value: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// One triggered/resolved transition row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub id: i64,
    pub rule_id: i64,
    pub website_id: i64,
    pub metric_type: MetricKind,
    pub metric_value: String,
    pub severity: Severity,
    pub is_resolved: bool,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

/// Outcome of evaluating one rule against one sample. Pure data; the
/// recorder turns these into event-row transitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub rule_id: i64,
    pub metric_type: MetricKind,
    pub breached: bool,
    pub severity: Severity,
    /// Canonical decimal rendering of the sample value for this metric.
    pub value: String,
}

/// State transition the recorder applied for one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AlertEventDelta {
    /// New unresolved event inserted.
    Triggered {
        event_id: i64,
        rule_id: i64,
        severity: Severity,
    },
    /// Existing open event refreshed in place (no duplicate row).
    Updated {
        event_id: i64,
        rule_id: i64,
        severity: Severity,
    },
    /// Open event marked resolved.
    Resolved { event_id: i64, rule_id: i64 },
}

/// Severity bucketing policy. The 50% overshoot boundary is a tunable
/// default, not a contract.
#[derive(Debug, Clone, Copy)]
pub struct SeverityPolicy {
    /// Overshoot (or, for lighthouseScore, deficit) past the threshold that
    /// upgrades a breach from yellow to red, as a percentage of the
    /// threshold.
    pub red_overshoot_percent: u32,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            red_overshoot_percent: 50,
        }
    }
}
