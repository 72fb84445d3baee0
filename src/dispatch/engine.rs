//! Digest dispatch loop. An external-style scheduler (a plain tokio tick
//! task) calls `dispatch_due` with a timestamp captured once per cycle;
//! everything that cycle sends is windowed against that snapshot.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::mailer::MailTransport;
use super::{compose_digest, EmailSubscription, SendResult};
use crate::analysis::ANALYSIS_REPORT_TYPE;
use crate::config::MAIL_SEND_TIMEOUT_SECS;
use crate::db::DashboardDb;
use crate::state::SharedState;

/// One dispatch pass: find due subscriptions, compose and send their
/// digests, advance `last_sent_at` only for confirmed deliveries.
pub async fn dispatch_due(
    db: &DashboardDb,
    mailer: &dyn MailTransport,
    now: DateTime<Utc>,
) -> Vec<SendResult> {
    let subscriptions = match db.dispatchable_subscriptions() {
        Ok(subs) => subs,
        Err(e) => {
            warn!("Failed to load subscriptions, skipping dispatch cycle: {}", e);
            return Vec::new();
        }
    };

    let mut results = Vec::new();
    for sub in subscriptions {
        if !sub.is_due(now) {
            continue;
        }
        results.push(dispatch_one(db, mailer, &sub, now).await);
    }
    results
}

async fn dispatch_one(
    db: &DashboardDb,
    mailer: &dyn MailTransport,
    sub: &EmailSubscription,
    now: DateTime<Utc>,
) -> SendResult {
    let mut result = SendResult {
        subscription_id: sub.id,
        website_id: sub.website_id,
        recipient: sub.recipient.clone(),
        delivered: false,
        event_count: 0,
        error: None,
    };

    let events = match db.events_for_digest(sub.website_id, sub.last_sent_at.as_deref()) {
        Ok(events) => events,
        Err(e) => {
            warn!(
                "Failed to load events for subscription {}: {}",
                sub.id, e
            );
            result.error = Some(e.to_string());
            return result;
        }
    };
    result.event_count = events.len();

    let report = db
        .latest_report(sub.website_id, ANALYSIS_REPORT_TYPE)
        .unwrap_or_else(|e| {
            warn!("Failed to load report for website {}: {}", sub.website_id, e);
            None
        });

    let (subject, body) = compose_digest(sub, &events, report.as_ref());

    // The transport has its own timeout; this outer bound also covers
    // transports that do not.
    let send = tokio::time::timeout(
        Duration::from_secs(MAIL_SEND_TIMEOUT_SECS + 1),
        mailer.send(&sub.recipient, &subject, &body),
    )
    .await;

    match send {
        Ok(Ok(())) => {
            if let Err(e) = db.mark_subscription_sent(sub.id, &now.to_rfc3339()) {
                // The digest went out but the baseline did not advance; the
                // next tick will resend the same window (at-least-once).
                warn!(
                    "Digest sent but failed to advance baseline for subscription {}: {}",
                    sub.id, e
                );
                result.error = Some(e.to_string());
            }
            result.delivered = true;
            info!(
                "Dispatched {} digest to {} ({} events)",
                sub.frequency, sub.recipient, result.event_count
            );
        }
        Ok(Err(e)) => {
            warn!("Digest delivery failed for subscription {}: {}", sub.id, e);
            result.error = Some(e.to_string());
        }
        Err(_) => {
            warn!("Digest delivery timed out for subscription {}", sub.id);
            result.error = Some("mail transport timed out".to_string());
        }
    }

    result
}

/// Spawn the recurring dispatcher task.
pub fn spawn_dispatcher(
    state: SharedState,
    mailer: Arc<dyn MailTransport>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let interval = Duration::from_secs(state.config.dispatch_interval_secs);
        info!("Dispatcher task started ({}s interval)", interval.as_secs());

        loop {
            sleep(interval).await;

            let now = Utc::now();
            let results = dispatch_due(&state.db, mailer.as_ref(), now).await;
            let delivered = results.iter().filter(|r| r.delivered).count();
            let failed = results.len() - delivered;
            if !results.is_empty() {
                info!(
                    "Dispatch cycle complete: {} delivered, {} failed",
                    delivered, failed
                );
            }
        }
    })
}
