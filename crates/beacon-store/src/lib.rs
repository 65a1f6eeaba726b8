//! SQLite-backed persistence for notification aggregates.
//!
//! The aggregate (notification + channel records + delivery config +
//! statistics) is saved and loaded as one transactional unit, keyed by
//! notification id. Channel rows are keyed by (notification id, channel);
//! config and stats are 1:1 JSON documents. Concurrent workers touching
//! different channels of the same notification serialize on this
//! per-aggregate transaction.

use beacon_core::error::{BeaconError, Result};
use beacon_core::types::{ChannelKind, ChannelStatus, NotificationKind, NotificationStatus, Priority};
use beacon_model::{ChannelRecord, DeliveryConfig, DeliveryStats, Notification};
use chrono::{DateTime, Utc};
use std::path::Path;

/// SQLite store for notification aggregates.
pub struct NotificationDb {
    conn: rusqlite::Connection,
}

impl NotificationDb {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| BeaconError::Store(format!("DB open: {e}")))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| BeaconError::Store(format!("DB open: {e}")))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                sender_id TEXT,
                creator_id TEXT,
                kind TEXT NOT NULL,
                priority TEXT NOT NULL DEFAULT 'normal',
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                is_read INTEGER NOT NULL DEFAULT 0,
                read_at TEXT,
                scheduled_at TEXT,
                sent_at TEXT,
                expires_at TEXT,
                created_at TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',   -- JSON array
                data TEXT                           -- JSON payload
            );
            CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
            CREATE INDEX IF NOT EXISTS idx_notifications_status ON notifications(status);

            -- One row per (notification, transport)
            CREATE TABLE IF NOT EXISTS notification_channels (
                notification_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                status TEXT NOT NULL DEFAULT 'pending',
                address TEXT,
                sent_at TEXT,
                delivered_at TEXT,
                message_id TEXT,
                error TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                next_retry_at TEXT,
                payload TEXT,                       -- JSON, tagged by channel
                PRIMARY KEY (notification_id, channel),
                FOREIGN KEY (notification_id) REFERENCES notifications(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_channels_retry ON notification_channels(status, next_retry_at);

            CREATE TABLE IF NOT EXISTS delivery_configs (
                notification_id TEXT PRIMARY KEY,
                config TEXT NOT NULL,               -- JSON document
                FOREIGN KEY (notification_id) REFERENCES notifications(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS delivery_stats (
                notification_id TEXT PRIMARY KEY,
                stats TEXT NOT NULL,                -- JSON document
                FOREIGN KEY (notification_id) REFERENCES notifications(id) ON DELETE CASCADE
            );
         ",
            )
            .map_err(|e| BeaconError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    // ─── Aggregate save/load ──────────────────────────────────

    /// Upsert the whole aggregate inside one transaction.
    pub fn save(&mut self, notification: &Notification) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| BeaconError::Store(format!("Begin tx: {e}")))?;

        let tags = serde_json::to_string(&notification.tags)
            .map_err(|e| BeaconError::Store(format!("Serialize tags: {e}")))?;
        let data = match &notification.data {
            Some(data) => Some(
                serde_json::to_string(data)
                    .map_err(|e| BeaconError::Store(format!("Serialize data: {e}")))?,
            ),
            None => None,
        };

        tx.execute(
            "INSERT OR REPLACE INTO notifications
             (id, user_id, sender_id, creator_id, kind, priority, title, content, status,
              is_read, read_at, scheduled_at, sent_at, expires_at, created_at, tags, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            rusqlite::params![
                notification.id,
                notification.user_id,
                notification.sender_id,
                notification.creator_id,
                notification.kind.as_str(),
                notification.priority.as_str(),
                notification.title,
                notification.content,
                notification.status.as_str(),
                notification.is_read as i32,
                notification.read_at.map(|t| t.to_rfc3339()),
                notification.scheduled_at.map(|t| t.to_rfc3339()),
                notification.sent_at.map(|t| t.to_rfc3339()),
                notification.expires_at.map(|t| t.to_rfc3339()),
                notification.created_at.to_rfc3339(),
                tags,
                data,
            ],
        )
        .map_err(|e| BeaconError::Store(format!("Save notification: {e}")))?;

        for record in &notification.channels {
            let payload = match &record.payload {
                Some(payload) => Some(
                    serde_json::to_string(payload)
                        .map_err(|e| BeaconError::Store(format!("Serialize payload: {e}")))?,
                ),
                None => None,
            };
            tx.execute(
                "INSERT OR REPLACE INTO notification_channels
                 (notification_id, channel, enabled, status, address, sent_at, delivered_at,
                  message_id, error, retry_count, next_retry_at, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    record.notification_id,
                    record.channel.as_str(),
                    record.enabled as i32,
                    record.status.as_str(),
                    record.address,
                    record.sent_at.map(|t| t.to_rfc3339()),
                    record.delivered_at.map(|t| t.to_rfc3339()),
                    record.message_id,
                    record.error,
                    record.retry_count,
                    record.next_retry_at.map(|t| t.to_rfc3339()),
                    payload,
                ],
            )
            .map_err(|e| BeaconError::Store(format!("Save channel: {e}")))?;
        }

        let config = serde_json::to_string(&notification.config)
            .map_err(|e| BeaconError::Store(format!("Serialize config: {e}")))?;
        tx.execute(
            "INSERT OR REPLACE INTO delivery_configs (notification_id, config) VALUES (?1, ?2)",
            rusqlite::params![notification.id, config],
        )
        .map_err(|e| BeaconError::Store(format!("Save config: {e}")))?;

        let stats = serde_json::to_string(&notification.stats)
            .map_err(|e| BeaconError::Store(format!("Serialize stats: {e}")))?;
        tx.execute(
            "INSERT OR REPLACE INTO delivery_stats (notification_id, stats) VALUES (?1, ?2)",
            rusqlite::params![notification.id, stats],
        )
        .map_err(|e| BeaconError::Store(format!("Save stats: {e}")))?;

        tx.commit()
            .map_err(|e| BeaconError::Store(format!("Commit: {e}")))?;
        tracing::debug!(notification = %notification.id, "aggregate saved");
        Ok(())
    }

    /// Load one aggregate. Missing child rows reconstruct as defaults.
    pub fn load(&self, id: &str) -> Result<Option<Notification>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, sender_id, creator_id, kind, priority, title, content,
                        status, is_read, read_at, scheduled_at, sent_at, expires_at,
                        created_at, tags, data
                 FROM notifications WHERE id = ?1",
                [id],
                Self::map_notification_row,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(BeaconError::Store(format!("Load notification: {other}"))),
            })?;

        let Some(mut notification) = row else {
            return Ok(None);
        };

        notification.channels = self.load_channels(id)?;
        notification.config = self
            .load_json_doc("delivery_configs", "config", id)?
            .unwrap_or_else(|| DeliveryConfig::new(id));
        notification.stats = self
            .load_json_doc("delivery_stats", "stats", id)?
            .unwrap_or_else(|| DeliveryStats::new(id));
        Ok(Some(notification))
    }

    /// Delete an aggregate and its child rows.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| BeaconError::Store(format!("Begin tx: {e}")))?;
        for table in [
            "notification_channels",
            "delivery_configs",
            "delivery_stats",
            "notifications",
        ] {
            tx.execute(
                &format!(
                    "DELETE FROM {table} WHERE {} = ?1",
                    if table == "notifications" { "id" } else { "notification_id" }
                ),
                [id],
            )
            .map_err(|e| BeaconError::Store(format!("Delete from {table}: {e}")))?;
        }
        tx.commit()
            .map_err(|e| BeaconError::Store(format!("Commit: {e}")))?;
        Ok(())
    }

    // ─── Worker queries ───────────────────────────────────────

    /// Pending notifications whose send gate is open at `now`
    /// (unscheduled, or scheduled time elapsed).
    pub fn due_notifications(&self, now: DateTime<Utc>) -> Vec<Notification> {
        let ids = self.ids_where(
            "SELECT id FROM notifications
             WHERE status = 'pending' AND (scheduled_at IS NULL OR scheduled_at <= ?1)
             ORDER BY created_at",
            &[&now.to_rfc3339()],
        );
        self.load_many(&ids)
    }

    /// Failed channels whose retry clock has elapsed at `now`.
    pub fn retry_due_channels(&self, now: DateTime<Utc>) -> Vec<ChannelRecord> {
        let mut stmt = match self.conn.prepare(
            "SELECT notification_id, channel, enabled, status, address, sent_at, delivered_at,
                    message_id, error, retry_count, next_retry_at, payload
             FROM notification_channels
             WHERE status = 'failed' AND next_retry_at IS NOT NULL AND next_retry_at <= ?1
             ORDER BY next_retry_at",
        ) {
            Ok(stmt) => stmt,
            Err(_) => return Vec::new(),
        };
        let rows = stmt
            .query_map([now.to_rfc3339()], Self::map_channel_row)
            .ok();
        rows.map(|r| r.filter_map(|c| c.ok()).collect())
            .unwrap_or_default()
    }

    /// Unread, non-cancelled notifications for a user, newest first.
    pub fn unread_for_user(&self, user_id: &str) -> Vec<Notification> {
        let ids = self.ids_where(
            "SELECT id FROM notifications
             WHERE user_id = ?1 AND is_read = 0 AND status != 'cancelled'
             ORDER BY created_at DESC",
            &[&user_id],
        );
        self.load_many(&ids)
    }

    /// Most recent notifications for a user.
    pub fn recent_for_user(&self, user_id: &str, limit: usize) -> Vec<Notification> {
        let ids = self.ids_where(
            "SELECT id FROM notifications WHERE user_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
            &[&user_id, &(limit as i64)],
        );
        self.load_many(&ids)
    }

    // ─── Row mapping ──────────────────────────────────────────

    fn map_notification_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
        let id: String = row.get(0)?;
        let kind: String = row.get(4)?;
        let priority: String = row.get(5)?;
        let status: String = row.get(8)?;
        let tags: String = row.get(15)?;
        let data: Option<String> = row.get(16)?;

        Ok(Notification {
            user_id: row.get(1)?,
            sender_id: row.get(2)?,
            creator_id: row.get(3)?,
            kind: NotificationKind::parse(&kind).unwrap_or(NotificationKind::System),
            priority: Priority::parse(&priority).unwrap_or(Priority::Normal),
            title: row.get(6)?,
            content: row.get(7)?,
            status: NotificationStatus::parse(&status).unwrap_or(NotificationStatus::Pending),
            is_read: row.get::<_, i32>(9)? != 0,
            read_at: parse_opt_ts(row.get(10)?),
            scheduled_at: parse_opt_ts(row.get(11)?),
            sent_at: parse_opt_ts(row.get(12)?),
            expires_at: parse_opt_ts(row.get(13)?),
            created_at: parse_ts(&row.get::<_, String>(14)?),
            tags: serde_json::from_str(&tags).unwrap_or_default(),
            data: data.and_then(|d| serde_json::from_str(&d).ok()),
            channels: Vec::new(),
            config: DeliveryConfig::new(&id),
            stats: DeliveryStats::new(&id),
            id,
        })
    }

    fn map_channel_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelRecord> {
        let channel: String = row.get(1)?;
        let status: String = row.get(3)?;
        let payload: Option<String> = row.get(11)?;

        Ok(ChannelRecord {
            notification_id: row.get(0)?,
            channel: ChannelKind::parse(&channel).unwrap_or(ChannelKind::InApp),
            enabled: row.get::<_, i32>(2)? != 0,
            status: ChannelStatus::parse(&status).unwrap_or(ChannelStatus::Pending),
            address: row.get(4)?,
            sent_at: parse_opt_ts(row.get(5)?),
            delivered_at: parse_opt_ts(row.get(6)?),
            message_id: row.get(7)?,
            error: row.get(8)?,
            retry_count: row.get(9)?,
            next_retry_at: parse_opt_ts(row.get(10)?),
            payload: payload.and_then(|p| serde_json::from_str(&p).ok()),
        })
    }

    fn load_channels(&self, notification_id: &str) -> Result<Vec<ChannelRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT notification_id, channel, enabled, status, address, sent_at, delivered_at,
                        message_id, error, retry_count, next_retry_at, payload
                 FROM notification_channels WHERE notification_id = ?1 ORDER BY channel",
            )
            .map_err(|e| BeaconError::Store(format!("Load channels: {e}")))?;
        let rows = stmt
            .query_map([notification_id], Self::map_channel_row)
            .map_err(|e| BeaconError::Store(format!("Load channels: {e}")))?;
        Ok(rows.filter_map(|c| c.ok()).collect())
    }

    fn load_json_doc<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        id: &str,
    ) -> Result<Option<T>> {
        let doc: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT {column} FROM {table} WHERE notification_id = ?1"),
                [id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(BeaconError::Store(format!("Load {table}: {other}"))),
            })?;
        Ok(doc.and_then(|d| serde_json::from_str(&d).ok()))
    }

    fn ids_where(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Vec<String> {
        let mut stmt = match self.conn.prepare(sql) {
            Ok(stmt) => stmt,
            Err(_) => return Vec::new(),
        };
        stmt.query_map(params, |row| row.get::<_, String>(0))
            .ok()
            .map(|r| r.filter_map(|id| id.ok()).collect())
            .unwrap_or_default()
    }

    fn load_many(&self, ids: &[String]) -> Vec<Notification> {
        ids.iter()
            .filter_map(|id| self.load(id).ok().flatten())
            .collect()
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_opt_ts(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_model::{ChannelPayload, NewNotification};
    use chrono::Duration;

    fn sample(user: &str) -> Notification {
        Notification::create(NewNotification {
            user_id: user.to_string(),
            title: "Deploy finished".to_string(),
            content: "Build 1842 is live".to_string(),
            channels: vec![ChannelKind::Email, ChannelKind::InApp],
            ..NewNotification::default()
        })
        .unwrap()
    }

    #[test]
    fn test_open_and_migrate() {
        let dir = std::env::temp_dir().join("beacon-store-test");
        std::fs::create_dir_all(&dir).ok();
        let db = NotificationDb::open(&dir.join("test.db")).unwrap();
        assert!(db.load("missing").unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let mut db = NotificationDb::open_in_memory().unwrap();
        let mut n = sample("u1");
        n.add_tag("release");
        n.enable_channel(
            ChannelKind::Email,
            Some("user@example.com"),
            Some(ChannelPayload::Email {
                subject: Some("Deploy finished".into()),
                template: None,
                attachments: vec![],
            }),
        );
        n.mark_as_failed("SMTP timeout", Some(ChannelKind::Email));
        n.increment_retry_attempt();

        db.save(&n).unwrap();
        let loaded = db.load(&n.id).unwrap().unwrap();

        assert_eq!(loaded.user_id, "u1");
        assert_eq!(loaded.status, NotificationStatus::Failed);
        assert!(loaded.has_tag("release"));
        assert_eq!(loaded.channels.len(), 2);

        let email = loaded.channel(ChannelKind::Email).unwrap();
        assert_eq!(email.status, ChannelStatus::Failed);
        assert_eq!(email.retry_count, 1);
        assert_eq!(email.address.as_deref(), Some("user@example.com"));
        assert!(matches!(email.payload, Some(ChannelPayload::Email { .. })));

        assert_eq!(loaded.config.retry.as_ref().unwrap().current_attempt, 1);
        assert_eq!(loaded.stats.send_errors, 1);
        assert_eq!(loaded.stats.channel_stats["email"].failures, 1);
    }

    #[test]
    fn test_save_is_upsert() {
        let mut db = NotificationDb::open_in_memory().unwrap();
        let mut n = sample("u1");
        db.save(&n).unwrap();

        n.mark_as_read();
        db.save(&n).unwrap();

        let loaded = db.load(&n.id).unwrap().unwrap();
        assert!(loaded.is_read);
        assert_eq!(loaded.status, NotificationStatus::Read);
    }

    #[test]
    fn test_due_notifications() {
        let mut db = NotificationDb::open_in_memory().unwrap();
        let now = Utc::now();

        let immediate = sample("u1");
        db.save(&immediate).unwrap();

        let mut scheduled = sample("u1");
        scheduled.schedule(now + Duration::hours(2));
        db.save(&scheduled).unwrap();

        let mut read = sample("u1");
        read.mark_as_read();
        db.save(&read).unwrap();

        let due = db.due_notifications(now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, immediate.id);

        // Once the schedule elapses the second one becomes due
        let due = db.due_notifications(now + Duration::hours(3));
        assert_eq!(due.len(), 2);
    }

    #[test]
    fn test_retry_due_channels() {
        let mut db = NotificationDb::open_in_memory().unwrap();
        let mut n = sample("u1");
        n.mark_as_failed("down", Some(ChannelKind::Email));
        db.save(&n).unwrap();

        // First retry is ~10 minutes out: not due now, due in 15
        assert!(db.retry_due_channels(Utc::now()).is_empty());
        let due = db.retry_due_channels(Utc::now() + Duration::minutes(15));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].notification_id, n.id);
        assert_eq!(due[0].channel, ChannelKind::Email);
    }

    #[test]
    fn test_unread_for_user() {
        let mut db = NotificationDb::open_in_memory().unwrap();
        let a = sample("u1");
        db.save(&a).unwrap();

        let mut b = sample("u1");
        b.mark_as_read();
        db.save(&b).unwrap();

        let mut c = sample("u1");
        c.cancel();
        db.save(&c).unwrap();

        let other = sample("u2");
        db.save(&other).unwrap();

        let unread = db.unread_for_user("u1");
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, a.id);
    }

    #[test]
    fn test_delete_removes_children() {
        let mut db = NotificationDb::open_in_memory().unwrap();
        let n = sample("u1");
        db.save(&n).unwrap();
        db.delete(&n.id).unwrap();

        assert!(db.load(&n.id).unwrap().is_none());
        assert!(db.retry_due_channels(Utc::now() + Duration::days(365)).is_empty());
    }

    #[test]
    fn test_recent_for_user_limit() {
        let mut db = NotificationDb::open_in_memory().unwrap();
        for _ in 0..5 {
            db.save(&sample("u1")).unwrap();
        }
        assert_eq!(db.recent_for_user("u1", 3).len(), 3);
    }
}
