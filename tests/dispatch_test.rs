use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;

use vitals_dashboard::alerts::{MetricKind, SeverityPolicy};
use vitals_dashboard::db::DashboardDb;
use vitals_dashboard::dispatch::engine::dispatch_due;
use vitals_dashboard::dispatch::mailer::MailTransport;
use vitals_dashboard::dispatch::{Frequency, NewSubscription};
use vitals_dashboard::metrics::{ingest, NewSample};
use vitals_dashboard::websites::NewWebsite;

const NOW: &str = "2026-08-30T12:00:00+00:00";

#[derive(Default)]
struct MockMailer {
    sent: Mutex<Vec<(String, String, String)>>,
    fail: AtomicBool,
}

#[async_trait]
impl MailTransport for MockMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("gateway unavailable");
        }
        self.sent.lock().unwrap().push((
            recipient.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

fn setup() -> (TempDir, DashboardDb, i64) {
    let dir = tempfile::tempdir().unwrap();
    let db = DashboardDb::new(dir.path()).unwrap();
    let site = db
        .create_website(
            &NewWebsite {
                user_id: 1,
                url: "https://example.com".to_string(),
                name: "Example".to_string(),
            },
            NOW,
        )
        .unwrap();
    (dir, db, site.id)
}

fn weekly_subscription(db: &DashboardDb, website_id: i64) -> i64 {
    db.create_subscription(
        &NewSubscription {
            user_id: 1,
            website_id,
            recipient: "ops@example.com".to_string(),
            frequency: Frequency::Weekly,
        },
        NOW,
    )
    .unwrap()
    .id
}

#[tokio::test]
async fn test_never_sent_subscription_dispatches_immediately() {
    let (_dir, db, site_id) = setup();
    let sub_id = weekly_subscription(&db, site_id);
    let mailer = MockMailer::default();

    let now = Utc::now();
    let results = dispatch_due(&db, &mailer, now).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].delivered);
    assert_eq!(mailer.sent.lock().unwrap().len(), 1);

    // Baseline advanced to the cycle timestamp.
    let subs = db.dispatchable_subscriptions().unwrap();
    let sub = subs.iter().find(|s| s.id == sub_id).unwrap();
    assert_eq!(sub.last_sent_at.as_deref(), Some(now.to_rfc3339().as_str()));
}

#[tokio::test]
async fn test_recent_subscription_is_not_due() {
    let (_dir, db, site_id) = setup();
    let sub_id = weekly_subscription(&db, site_id);
    let now = Utc::now();
    db.mark_subscription_sent(sub_id, &(now - Duration::days(3)).to_rfc3339())
        .unwrap();
    let mailer = MockMailer::default();

    let results = dispatch_due(&db, &mailer, now).await;
    assert!(results.is_empty());
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_elapsed_period_dispatches_again() {
    let (_dir, db, site_id) = setup();
    let sub_id = weekly_subscription(&db, site_id);
    let now = Utc::now();
    db.mark_subscription_sent(sub_id, &(now - Duration::days(8)).to_rfc3339())
        .unwrap();
    let mailer = MockMailer::default();

    let results = dispatch_due(&db, &mailer, now).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].delivered);
}

#[tokio::test]
async fn test_failed_delivery_keeps_baseline() {
    let (_dir, db, site_id) = setup();
    let sub_id = weekly_subscription(&db, site_id);
    let mailer = MockMailer::default();
    mailer.fail.store(true, Ordering::SeqCst);

    let results = dispatch_due(&db, &mailer, Utc::now()).await;
    assert_eq!(results.len(), 1);
    assert!(!results[0].delivered);
    assert!(results[0].error.is_some());

    // Unsent digest stays due for the next cycle.
    let subs = db.dispatchable_subscriptions().unwrap();
    let sub = subs.iter().find(|s| s.id == sub_id).unwrap();
    assert!(sub.last_sent_at.is_none());
    assert!(sub.is_due(Utc::now()));
}

#[tokio::test]
async fn test_deactivated_website_is_skipped() {
    let (_dir, db, site_id) = setup();
    weekly_subscription(&db, site_id);
    db.set_website_active(site_id, false, NOW).unwrap();
    let mailer = MockMailer::default();

    let results = dispatch_due(&db, &mailer, Utc::now()).await;
    assert!(results.is_empty());
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_digest_includes_pending_events() {
    let (_dir, db, site_id) = setup();
    weekly_subscription(&db, site_id);
    db.create_rule(site_id, MetricKind::Lcp, "2500", NOW).unwrap();
    let input = NewSample {
        website_id: site_id,
        lcp: Some(4000),
        fid: None,
        cls: None,
        lighthouse_score: None,
        performance_score: None,
    };
    ingest(&db, &input, &SeverityPolicy::default(), NOW).unwrap();

    let mailer = MockMailer::default();
    let results = dispatch_due(&db, &mailer, Utc::now()).await;
    assert_eq!(results[0].event_count, 1);

    let sent = mailer.sent.lock().unwrap();
    let (recipient, subject, body) = &sent[0];
    assert_eq!(recipient, "ops@example.com");
    assert!(subject.contains("Example"));
    assert!(body.contains("lcp"));
    assert!(body.contains("4000"));
}
