pub mod engine;
pub mod mailer;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::alerts::AlertEvent;
use crate::analysis::PerformanceReport;
use crate::config::{MONTHLY_PERIOD_DAYS, WEEKLY_PERIOD_DAYS};
use crate::error::DashboardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    pub fn period_days(&self) -> i64 {
        match self {
            Frequency::Weekly => WEEKLY_PERIOD_DAYS,
            Frequency::Monthly => MONTHLY_PERIOD_DAYS,
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(format!("unknown frequency: {s}")),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSubscription {
    pub id: i64,
    pub user_id: i64,
    pub website_id: i64,
    /// Display name of the subscribed website, joined in for digests.
    pub website_name: String,
    pub recipient: String,
    pub frequency: Frequency,
    pub is_active: bool,
    pub last_sent_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl EmailSubscription {
    /// Due when never sent, or when a full period has elapsed. A
    /// `last_sent_at` we can no longer parse counts as never sent.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = &self.last_sent_at else {
            return true;
        };
        match DateTime::parse_from_rfc3339(last) {
            Ok(last) => {
                now - last.with_timezone(&Utc) >= Duration::days(self.frequency.period_days())
            }
            Err(_) => true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    pub user_id: i64,
    pub website_id: i64,
    pub recipient: String,
    pub frequency: Frequency,
}

impl NewSubscription {
    pub fn validate(&self) -> Result<(), DashboardError> {
        let r = self.recipient.trim();
        if r.is_empty() || !r.contains('@') || r.contains(char::is_whitespace) {
            return Err(DashboardError::validation(format!(
                "invalid recipient address: {:?}",
                self.recipient
            )));
        }
        Ok(())
    }
}

/// Outcome of one digest attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub subscription_id: i64,
    pub website_id: i64,
    pub recipient: String,
    pub delivered: bool,
    pub event_count: usize,
    pub error: Option<String>,
}

/// Compose the plain-text digest for one subscription. Returns
/// (subject, body).
pub fn compose_digest(
    sub: &EmailSubscription,
    events: &[AlertEvent],
    report: Option<&PerformanceReport>,
) -> (String, String) {
    let subject = format!(
        "[vitals] {} digest for {}: {} alert event(s)",
        sub.frequency,
        sub.website_name,
        events.len()
    );

    let mut body = format!("{} performance digest for {}\n", sub.frequency, sub.website_name);
    match &sub.last_sent_at {
        Some(since) => body.push_str(&format!("Covering alert events since {since}\n\n")),
        None => body.push_str("Covering all currently unresolved alert events\n\n"),
    }

    if events.is_empty() {
        body.push_str("No alert events in this period.\n");
    } else {
        for event in events {
            let status = if event.is_resolved {
                "resolved"
            } else {
                "open"
            };
            body.push_str(&format!(
                "- [{severity}] {metric} = {value} ({status}, triggered {at})\n",
                severity = event.severity,
                metric = event.metric_type,
                value = event.metric_value,
                status = status,
                at = event.created_at,
            ));
        }
    }

    if let Some(report) = report {
        body.push_str("\nLatest analysis:\n");
        if let Some(summary) = &report.summary {
            body.push_str(summary);
            body.push('\n');
        }
        if let Some(recommendations) = &report.recommendations {
            body.push_str(recommendations);
            body.push('\n');
        }
    }

    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{MetricKind, Severity};

    fn subscription(frequency: Frequency, last_sent_at: Option<&str>) -> EmailSubscription {
        EmailSubscription {
            id: 1,
            user_id: 1,
            website_id: 1,
            website_name: "Example".to_string(),
            recipient: "dev@example.com".to_string(),
            frequency,
            is_active: true,
            last_sent_at: last_sent_at.map(str::to_string),
            created_at: "2026-08-01T00:00:00+00:00".to_string(),
            updated_at: "2026-08-01T00:00:00+00:00".to_string(),
        }
    }

    fn days_ago(now: DateTime<Utc>, days: i64) -> String {
        (now - Duration::days(days)).to_rfc3339()
    }

    #[test]
    fn test_never_sent_is_due_immediately() {
        let sub = subscription(Frequency::Weekly, None);
        assert!(sub.is_due(Utc::now()));
    }

    #[test]
    fn test_weekly_eight_days_ago_is_due() {
        let now = Utc::now();
        let sub = subscription(Frequency::Weekly, Some(&days_ago(now, 8)));
        assert!(sub.is_due(now));
    }

    #[test]
    fn test_weekly_three_days_ago_is_not_due() {
        let now = Utc::now();
        let sub = subscription(Frequency::Weekly, Some(&days_ago(now, 3)));
        assert!(!sub.is_due(now));
    }

    #[test]
    fn test_weekly_exactly_seven_days_is_due() {
        let now = Utc::now();
        let sub = subscription(Frequency::Weekly, Some(&days_ago(now, 7)));
        assert!(sub.is_due(now));
    }

    #[test]
    fn test_monthly_uses_thirty_day_period() {
        let now = Utc::now();
        assert!(!subscription(Frequency::Monthly, Some(&days_ago(now, 8))).is_due(now));
        assert!(subscription(Frequency::Monthly, Some(&days_ago(now, 31))).is_due(now));
    }

    #[test]
    fn test_unparsable_last_sent_counts_as_never_sent() {
        let sub = subscription(Frequency::Weekly, Some("garbage"));
        assert!(sub.is_due(Utc::now()));
    }

    #[test]
    fn test_subscription_validation() {
        let mut sub = NewSubscription {
            user_id: 1,
            website_id: 1,
            recipient: "dev@example.com".to_string(),
            frequency: Frequency::Weekly,
        };
        assert!(sub.validate().is_ok());

        sub.recipient = "no-at-sign".to_string();
        assert!(sub.validate().is_err());

        sub.recipient = "has spaces@example.com".to_string();
        assert!(sub.validate().is_err());
    }

    #[test]
    fn test_digest_lists_events_and_window() {
        let sub = subscription(Frequency::Weekly, Some("2026-08-20T00:00:00+00:00"));
        let events = vec![AlertEvent {
            id: 1,
            rule_id: 7,
            website_id: 1,
            metric_type: MetricKind::Lcp,
            metric_value: "4000".to_string(),
            severity: Severity::Red,
            is_resolved: false,
            created_at: "2026-08-25T00:00:00+00:00".to_string(),
            resolved_at: None,
        }];

        let (subject, body) = compose_digest(&sub, &events, None);
        assert!(subject.contains("Example"));
        assert!(subject.contains("1 alert event"));
        assert!(body.contains("since 2026-08-20T00:00:00+00:00"));
        assert!(body.contains("[red] lcp = 4000"));
    }

    #[test]
    fn test_digest_for_first_send_covers_unresolved() {
        let sub = subscription(Frequency::Weekly, None);
        let (_, body) = compose_digest(&sub, &[], None);
        assert!(body.contains("currently unresolved"));
        assert!(body.contains("No alert events"));
    }
}
