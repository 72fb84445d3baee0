//! Threshold evaluation. Pure: takes a sample and the website's rules,
//! returns per-rule results, touches nothing.

use super::{AlertRule, EvaluationResult, MetricKind, Severity, SeverityPolicy};
use crate::decimal::Decimal;
use crate::metrics::MetricSample;

/// Evaluate `sample` against `rules`.
///
/// Inactive rules, rules whose metric is absent from the sample, and rules
/// whose stored threshold no longer parses are skipped; a missing value is
/// never a breach. Equality with the threshold is compliant in both
/// directions.
pub fn evaluate(
    sample: &MetricSample,
    rules: &[AlertRule],
    policy: &SeverityPolicy,
) -> Vec<EvaluationResult> {
    let mut results = Vec::new();

    for rule in rules {
        if !rule.is_active {
            continue;
        }
        let Some(value) = sample.value_of(rule.metric_type) else {
            continue;
        };
        let Ok(threshold) = rule.threshold_value.parse::<Decimal>() else {
            continue;
        };

        let breached = if rule.metric_type.lower_is_worse() {
            value < threshold
        } else {
            value > threshold
        };

        let severity = if !breached {
            Severity::Green
        } else {
            bucket_severity(rule.metric_type, value, threshold, policy)
        };

        results.push(EvaluationResult {
            rule_id: rule.id,
            metric_type: rule.metric_type,
            breached,
            severity,
            value: value.to_string(),
        });
    }

    results
}

fn bucket_severity(
    kind: MetricKind,
    value: Decimal,
    threshold: Decimal,
    policy: &SeverityPolicy,
) -> Severity {
    let red = if kind.lower_is_worse() {
        value.undershoots_by_percent(threshold, policy.red_overshoot_percent)
    } else {
        value.overshoots_by_percent(threshold, policy.red_overshoot_percent)
    };
    if red {
        Severity::Red
    } else {
        Severity::Yellow
    }
}
