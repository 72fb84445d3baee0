//! Alert event recorder: turns evaluation results into event-row
//! transitions, one transaction per website per sample.
//!
//! Invariant: at most one unresolved event per rule. Within this process
//! the connection mutex plus `BEGIN IMMEDIATE` serialize the check-then-
//! insert; across processes the partial unique index on
//! `alert_events(rule_id) WHERE is_resolved = 0` is the backstop, and the
//! insert's ON CONFLICT clause downgrades the losing writer to an in-place
//! update instead of an error.

use rusqlite::{params, Connection, OptionalExtension};

use super::{AlertEventDelta, EvaluationResult};
use crate::db::DashboardDb;

pub fn apply(
    db: &DashboardDb,
    website_id: i64,
    results: &[EvaluationResult],
    now: &str,
) -> anyhow::Result<Vec<AlertEventDelta>> {
    if results.is_empty() {
        return Ok(Vec::new());
    }

    let conn = db.conn();
    conn.execute_batch("BEGIN IMMEDIATE")?;
    match apply_inner(&conn, website_id, results, now) {
        Ok(deltas) => {
            conn.execute_batch("COMMIT")?;
            Ok(deltas)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

fn apply_inner(
    conn: &Connection,
    website_id: i64,
    results: &[EvaluationResult],
    now: &str,
) -> anyhow::Result<Vec<AlertEventDelta>> {
    let mut deltas = Vec::new();

    for result in results {
        let open_event: Option<i64> = conn
            .query_row(
                "SELECT id FROM alert_events WHERE rule_id = ?1 AND is_resolved = 0",
                params![result.rule_id],
                |row| row.get(0),
            )
            .optional()?;

        match (result.breached, open_event) {
            (true, Some(event_id)) => {
                // Repeated breach: refresh the open row, never a duplicate.
                conn.execute(
                    "UPDATE alert_events SET severity = ?1, metric_value = ?2 WHERE id = ?3",
                    params![result.severity.as_str(), result.value, event_id],
                )?;
                deltas.push(AlertEventDelta::Updated {
                    event_id,
                    rule_id: result.rule_id,
                    severity: result.severity,
                });
            }
            (true, None) => {
                conn.execute(
                    "INSERT INTO alert_events
                        (rule_id, website_id, metric_value, severity, is_resolved, created_at)
                     VALUES (?1, ?2, ?3, ?4, 0, ?5)
                     ON CONFLICT(rule_id) WHERE is_resolved = 0
                     DO UPDATE SET severity = excluded.severity,
                                   metric_value = excluded.metric_value",
                    params![
                        result.rule_id,
                        website_id,
                        result.value,
                        result.severity.as_str(),
                        now
                    ],
                )?;
                let event_id: i64 = conn.query_row(
                    "SELECT id FROM alert_events WHERE rule_id = ?1 AND is_resolved = 0",
                    params![result.rule_id],
                    |row| row.get(0),
                )?;
                deltas.push(AlertEventDelta::Triggered {
                    event_id,
                    rule_id: result.rule_id,
                    severity: result.severity,
                });
            }
            (false, Some(event_id)) => {
                // Back in range: close the open event, keep its last breach
                // severity as the historical record.
                conn.execute(
                    "UPDATE alert_events SET is_resolved = 1, resolved_at = ?1 WHERE id = ?2",
                    params![now, event_id],
                )?;
                deltas.push(AlertEventDelta::Resolved {
                    event_id,
                    rule_id: result.rule_id,
                });
            }
            (false, None) => {}
        }
    }

    Ok(deltas)
}
