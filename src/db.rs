use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use crate::alerts::{AlertEvent, AlertRule, MetricKind, Severity};
use crate::dispatch::{EmailSubscription, Frequency, NewSubscription};
use crate::metrics::{MetricSample, NewSample};
use crate::analysis::PerformanceReport;
use crate::websites::{NewWebsite, Website};

pub struct DashboardDb {
    conn: Mutex<Connection>,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl DashboardDb {
    pub fn new(data_dir: &Path) -> anyhow::Result<Self> {
        let db_path = data_dir.join("dashboard.db");
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS websites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                url TEXT NOT NULL,
                name TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS metric_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                website_id INTEGER NOT NULL REFERENCES websites(id),
                lcp INTEGER,
                fid INTEGER,
                cls TEXT,
                lighthouse_score INTEGER,
                performance_score INTEGER,
                recorded_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alert_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                website_id INTEGER NOT NULL REFERENCES websites(id),
                metric_type TEXT NOT NULL,
                threshold_value TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alert_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rule_id INTEGER NOT NULL REFERENCES alert_rules(id),
                website_id INTEGER NOT NULL,
                metric_value TEXT NOT NULL,
                severity TEXT NOT NULL,
                is_resolved INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                resolved_at TEXT
            );

            CREATE TABLE IF NOT EXISTS email_subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                website_id INTEGER NOT NULL REFERENCES websites(id),
                recipient TEXT NOT NULL,
                frequency TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_sent_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS performance_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                website_id INTEGER NOT NULL REFERENCES websites(id),
                report_type TEXT NOT NULL,
                summary TEXT,
                metrics TEXT,
                recommendations TEXT,
                created_at TEXT NOT NULL
            );

            -- At most one unresolved event per rule; the recorder's upsert
            -- targets this index.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_ae_open_rule
                ON alert_events(rule_id) WHERE is_resolved = 0;

            CREATE INDEX IF NOT EXISTS idx_ws_user ON websites(user_id);
            CREATE INDEX IF NOT EXISTS idx_ms_website ON metric_samples(website_id, recorded_at);
            CREATE INDEX IF NOT EXISTS idx_ar_website ON alert_rules(website_id);
            CREATE INDEX IF NOT EXISTS idx_ae_website ON alert_events(website_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_es_user ON email_subscriptions(user_id);
            CREATE INDEX IF NOT EXISTS idx_pr_website ON performance_reports(website_id, report_type, created_at);
        ",
        )?;
        Ok(())
    }

    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ========================================================================
    // Websites
    // ========================================================================

    pub fn create_website(&self, site: &NewWebsite, now: &str) -> anyhow::Result<Website> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO websites (user_id, url, name, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)",
            params![site.user_id, site.url, site.name.trim(), now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Website {
            id,
            user_id: site.user_id,
            url: site.url.clone(),
            name: site.name.trim().to_string(),
            is_active: true,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }

    pub fn list_websites(&self, user_id: i64) -> anyhow::Result<Vec<Website>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, url, name, is_active, created_at, updated_at
             FROM websites WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], website_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_website(&self, id: i64) -> anyhow::Result<Option<Website>> {
        let conn = self.conn();
        let site = conn
            .query_row(
                "SELECT id, user_id, url, name, is_active, created_at, updated_at
                 FROM websites WHERE id = ?1",
                params![id],
                website_from_row,
            )
            .optional()?;
        Ok(site)
    }

    /// Soft-deactivate. Returns false when the website does not exist.
    pub fn set_website_active(&self, id: i64, active: bool, now: &str) -> anyhow::Result<bool> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE websites SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active as i64, now, id],
        )?;
        Ok(changed > 0)
    }

    // ========================================================================
    // Metric samples
    // ========================================================================

    pub fn insert_sample(&self, sample: &NewSample, now: &str) -> anyhow::Result<MetricSample> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO metric_samples
                (website_id, lcp, fid, cls, lighthouse_score, performance_score, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sample.website_id,
                sample.lcp,
                sample.fid,
                sample.cls,
                sample.lighthouse_score,
                sample.performance_score,
                now
            ],
        )?;
        Ok(MetricSample {
            id: conn.last_insert_rowid(),
            website_id: sample.website_id,
            lcp: sample.lcp,
            fid: sample.fid,
            cls: sample.cls.clone(),
            lighthouse_score: sample.lighthouse_score,
            performance_score: sample.performance_score,
            recorded_at: now.to_string(),
        })
    }

    pub fn list_samples(&self, website_id: i64, limit: i64) -> anyhow::Result<Vec<MetricSample>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, website_id, lcp, fid, cls, lighthouse_score, performance_score, recorded_at
             FROM metric_samples WHERE website_id = ?1
             ORDER BY recorded_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![website_id, limit], |row| {
            Ok(MetricSample {
                id: row.get(0)?,
                website_id: row.get(1)?,
                lcp: row.get(2)?,
                fid: row.get(3)?,
                cls: row.get(4)?,
                lighthouse_score: row.get(5)?,
                performance_score: row.get(6)?,
                recorded_at: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ========================================================================
    // Alert rules
    // ========================================================================

    pub fn create_rule(
        &self,
        website_id: i64,
        metric_type: MetricKind,
        threshold_value: &str,
        now: &str,
    ) -> anyhow::Result<AlertRule> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO alert_rules (website_id, metric_type, threshold_value, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)",
            params![website_id, metric_type.as_str(), threshold_value, now],
        )?;
        Ok(AlertRule {
            id: conn.last_insert_rowid(),
            website_id,
            metric_type,
            threshold_value: threshold_value.to_string(),
            is_active: true,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }

    pub fn list_rules(&self, website_id: i64) -> anyhow::Result<Vec<AlertRule>> {
        self.query_rules(website_id, false)
    }

    pub fn active_rules(&self, website_id: i64) -> anyhow::Result<Vec<AlertRule>> {
        self.query_rules(website_id, true)
    }

    fn query_rules(&self, website_id: i64, active_only: bool) -> anyhow::Result<Vec<AlertRule>> {
        let conn = self.conn();
        let sql = if active_only {
            "SELECT id, website_id, metric_type, threshold_value, is_active, created_at, updated_at
             FROM alert_rules WHERE website_id = ?1 AND is_active = 1 ORDER BY id"
        } else {
            "SELECT id, website_id, metric_type, threshold_value, is_active, created_at, updated_at
             FROM alert_rules WHERE website_id = ?1 ORDER BY id"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![website_id], rule_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ========================================================================
    // Alert events (reads; the recorder owns the write path)
    // ========================================================================

    pub fn recent_events(&self, website_id: i64, limit: i64) -> anyhow::Result<Vec<AlertEvent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT e.id, e.rule_id, e.website_id, r.metric_type, e.metric_value,
                    e.severity, e.is_resolved, e.created_at, e.resolved_at
             FROM alert_events e JOIN alert_rules r ON r.id = e.rule_id
             WHERE e.website_id = ?1
             ORDER BY e.created_at DESC, e.id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![website_id, limit], event_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Events for one digest window. With a boundary: events created
    /// strictly after it. Without: everything currently unresolved.
    pub fn events_for_digest(
        &self,
        website_id: i64,
        since: Option<&str>,
    ) -> anyhow::Result<Vec<AlertEvent>> {
        let conn = self.conn();
        let (sql, args): (&str, Vec<&dyn rusqlite::ToSql>) = match since {
            Some(ref since) => (
                "SELECT e.id, e.rule_id, e.website_id, r.metric_type, e.metric_value,
                        e.severity, e.is_resolved, e.created_at, e.resolved_at
                 FROM alert_events e JOIN alert_rules r ON r.id = e.rule_id
                 WHERE e.website_id = ?1 AND e.created_at > ?2
                 ORDER BY e.created_at, e.id",
                vec![&website_id, since],
            ),
            None => (
                "SELECT e.id, e.rule_id, e.website_id, r.metric_type, e.metric_value,
                        e.severity, e.is_resolved, e.created_at, e.resolved_at
                 FROM alert_events e JOIN alert_rules r ON r.id = e.rule_id
                 WHERE e.website_id = ?1 AND e.is_resolved = 0
                 ORDER BY e.created_at, e.id",
                vec![&website_id],
            ),
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(args.as_slice(), event_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ========================================================================
    // Email subscriptions
    // ========================================================================

    pub fn create_subscription(
        &self,
        sub: &NewSubscription,
        now: &str,
    ) -> anyhow::Result<EmailSubscription> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO email_subscriptions
                (user_id, website_id, recipient, frequency, is_active, last_sent_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, NULL, ?5, ?5)",
            params![
                sub.user_id,
                sub.website_id,
                sub.recipient.trim(),
                sub.frequency.as_str(),
                now
            ],
        )?;
        let id = conn.last_insert_rowid();
        let website_name: String = conn
            .query_row(
                "SELECT name FROM websites WHERE id = ?1",
                params![sub.website_id],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or_default();
        Ok(EmailSubscription {
            id,
            user_id: sub.user_id,
            website_id: sub.website_id,
            website_name,
            recipient: sub.recipient.trim().to_string(),
            frequency: sub.frequency,
            is_active: true,
            last_sent_at: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }

    pub fn list_subscriptions(&self, user_id: i64) -> anyhow::Result<Vec<EmailSubscription>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.user_id, s.website_id, w.name, s.recipient, s.frequency,
                    s.is_active, s.last_sent_at, s.created_at, s.updated_at
             FROM email_subscriptions s JOIN websites w ON w.id = s.website_id
             WHERE s.user_id = ?1 ORDER BY s.id",
        )?;
        let rows = stmt.query_map(params![user_id], subscription_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Subscriptions the dispatcher may consider: active rows on active
    /// websites. Due-ness is decided in code against the tick's timestamp.
    pub fn dispatchable_subscriptions(&self) -> anyhow::Result<Vec<EmailSubscription>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.user_id, s.website_id, w.name, s.recipient, s.frequency,
                    s.is_active, s.last_sent_at, s.created_at, s.updated_at
             FROM email_subscriptions s JOIN websites w ON w.id = s.website_id
             WHERE s.is_active = 1 AND w.is_active = 1 ORDER BY s.id",
        )?;
        let rows = stmt.query_map([], subscription_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Advance the send baseline. Called only after confirmed delivery.
    pub fn mark_subscription_sent(&self, id: i64, now: &str) -> anyhow::Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE email_subscriptions SET last_sent_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        Ok(())
    }

    // ========================================================================
    // Performance reports
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    pub fn insert_report(
        &self,
        website_id: i64,
        report_type: &str,
        summary: Option<&str>,
        metrics: Option<&str>,
        recommendations: Option<&str>,
        now: &str,
    ) -> anyhow::Result<PerformanceReport> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO performance_reports
                (website_id, report_type, summary, metrics, recommendations, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![website_id, report_type, summary, metrics, recommendations, now],
        )?;
        Ok(PerformanceReport {
            id: conn.last_insert_rowid(),
            website_id,
            report_type: report_type.to_string(),
            summary: summary.map(str::to_string),
            metrics: metrics.map(str::to_string),
            recommendations: recommendations.map(str::to_string),
            created_at: now.to_string(),
        })
    }

    pub fn latest_report(
        &self,
        website_id: i64,
        report_type: &str,
    ) -> anyhow::Result<Option<PerformanceReport>> {
        let conn = self.conn();
        let report = conn
            .query_row(
                "SELECT id, website_id, report_type, summary, metrics, recommendations, created_at
                 FROM performance_reports
                 WHERE website_id = ?1 AND report_type = ?2
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![website_id, report_type],
                |row| {
                    Ok(PerformanceReport {
                        id: row.get(0)?,
                        website_id: row.get(1)?,
                        report_type: row.get(2)?,
                        summary: row.get(3)?,
                        metrics: row.get(4)?,
                        recommendations: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(report)
    }
}

// ============================================================================
// Row mappers
// ============================================================================

fn website_from_row(row: &Row<'_>) -> rusqlite::Result<Website> {
    Ok(Website {
        id: row.get(0)?,
        user_id: row.get(1)?,
        url: row.get(2)?,
        name: row.get(3)?,
        is_active: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<AlertRule> {
    let metric_type: String = row.get(2)?;
    Ok(AlertRule {
        id: row.get(0)?,
        website_id: row.get(1)?,
        metric_type: MetricKind::from_str(&metric_type).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?,
        threshold_value: row.get(3)?,
        is_active: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<AlertEvent> {
    let metric_type: String = row.get(3)?;
    let severity: String = row.get(5)?;
    Ok(AlertEvent {
        id: row.get(0)?,
        rule_id: row.get(1)?,
        website_id: row.get(2)?,
        metric_type: MetricKind::from_str(&metric_type).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?,
        metric_value: row.get(4)?,
        severity: Severity::from_str(&severity).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?,
        is_resolved: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
        resolved_at: row.get(8)?,
    })
}

fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<EmailSubscription> {
    let frequency: String = row.get(5)?;
    Ok(EmailSubscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        website_id: row.get(2)?,
        website_name: row.get(3)?,
        recipient: row.get(4)?,
        frequency: Frequency::from_str(&frequency).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?,
        is_active: row.get::<_, i64>(6)? != 0,
        last_sent_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
