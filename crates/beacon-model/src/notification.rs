//! The notification root aggregate.
//!
//! Owns the channel records, the delivery config, and the statistics
//! aggregator, and coordinates them through the lifecycle operations
//! (schedule, send, read, cancel, retry). An external worker drives
//! per-channel delivery; an external UI drives read/open/click events.
//!
//! Once cancelled, the aggregate-level lifecycle methods become no-ops.
//! Direct mutation of an owned `ChannelRecord` is not guarded.

use beacon_core::error::{BeaconError, Result};
use beacon_core::types::{
    ChannelKind, NotificationKind, NotificationStatus, Priority, ValidationReport,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::channel::{ChannelPayload, ChannelRecord};
use crate::delivery::DeliveryConfig;
use crate::stats::{DeliveryStats, UNATTRIBUTED_CHANNEL};

const MAX_TITLE_LEN: usize = 200;
const MAX_CONTENT_LEN: usize = 5_000;

/// Structured payload attached to a notification: the source entity,
/// the action that produced it, and navigation targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub action_by: Option<String>,
    #[serde(default)]
    pub action_by_name: Option<String>,
    #[serde(default)]
    pub action_at: Option<DateTime<Utc>>,
    /// Web navigation target.
    #[serde(default)]
    pub url: Option<String>,
    /// Mobile deep-link target.
    #[serde(default)]
    pub deep_link: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Template variables for rendering.
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,
}

impl NotificationData {
    /// Overlay the set fields of `patch`; maps are extended, not replaced.
    fn merge(&mut self, patch: NotificationData) {
        macro_rules! take {
            ($($field:ident),+ $(,)?) => {
                $(if patch.$field.is_some() { self.$field = patch.$field; })+
            };
        }
        take!(
            entity_type, entity_id, entity_name, action, action_by,
            action_by_name, action_at, url, deep_link,
        );
        self.metadata.extend(patch.metadata);
        self.variables.extend(patch.variables);
    }
}

/// Input for `Notification::create`.
#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: Option<NotificationKind>,
    pub title: String,
    pub content: String,
    pub priority: Option<Priority>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub channels: Vec<ChannelKind>,
    pub data: Option<NotificationData>,
    pub sender_id: Option<String>,
    pub creator_id: Option<String>,
}

/// The root aggregate. See the module docs for the ownership picture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub creator_id: Option<String>,
    pub kind: NotificationKind,
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub data: Option<NotificationData>,
    pub status: NotificationStatus,
    pub is_read: bool,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// One record per distinct transport.
    pub channels: Vec<ChannelRecord>,
    pub config: DeliveryConfig,
    pub stats: DeliveryStats,
}

impl Notification {
    // ─── Construction ───────────────────────────────────────

    /// Validate the input and build a pending notification. The only
    /// supported entry point besides the convenience constructors below.
    pub fn create(input: NewNotification) -> Result<Self> {
        let report = Self::validate(&input);
        if !report.valid {
            return Err(BeaconError::Validation(report.errors));
        }

        let id = Uuid::new_v4().to_string();
        let channels = input
            .channels
            .iter()
            .map(|kind| ChannelRecord::new(&id, *kind))
            .collect();

        Ok(Self {
            user_id: input.user_id,
            sender_id: input.sender_id,
            creator_id: input.creator_id,
            kind: input.kind.unwrap_or(NotificationKind::System),
            priority: input.priority.unwrap_or(Priority::Normal),
            tags: Vec::new(),
            title: input.title,
            content: input.content,
            data: input.data,
            status: NotificationStatus::Pending,
            is_read: false,
            read_at: None,
            scheduled_at: input.scheduled_at,
            sent_at: None,
            expires_at: input.expires_at,
            created_at: Utc::now(),
            channels,
            config: DeliveryConfig::new(&id),
            stats: DeliveryStats::new(&id),
            id,
        })
    }

    /// System announcement: type `system`, no channels preset.
    pub fn create_system(user_id: &str, title: &str, content: &str) -> Result<Self> {
        Self::create(NewNotification {
            user_id: user_id.to_string(),
            kind: Some(NotificationKind::System),
            title: title.to_string(),
            content: content.to_string(),
            ..NewNotification::default()
        })
    }

    /// Scheduled reminder: type `reminder`, priority `normal`.
    pub fn create_reminder(
        user_id: &str,
        title: &str,
        content: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Self> {
        Self::create(NewNotification {
            user_id: user_id.to_string(),
            kind: Some(NotificationKind::Reminder),
            title: title.to_string(),
            content: content.to_string(),
            priority: Some(Priority::Normal),
            scheduled_at: Some(scheduled_at),
            ..NewNotification::default()
        })
    }

    /// Invitation: type `invitation`, priority `high`, in-app and email
    /// channels pre-enabled.
    pub fn create_invitation(
        user_id: &str,
        title: &str,
        content: &str,
        sender_id: &str,
    ) -> Result<Self> {
        Self::create(NewNotification {
            user_id: user_id.to_string(),
            kind: Some(NotificationKind::Invitation),
            title: title.to_string(),
            content: content.to_string(),
            priority: Some(Priority::High),
            sender_id: Some(sender_id.to_string()),
            channels: vec![ChannelKind::InApp, ChannelKind::Email],
            ..NewNotification::default()
        })
    }

    /// Accumulating validation of construction input. Clock-dependent
    /// rules (`scheduled_at`, `expires_at` strictly in the future) are
    /// checked here only, never re-checked on later mutation.
    pub fn validate(input: &NewNotification) -> ValidationReport {
        let mut errors = Vec::new();
        let now = Utc::now();

        if input.user_id.trim().is_empty() {
            errors.push("recipient user id must not be empty".to_string());
        }
        if input.title.trim().is_empty() {
            errors.push("title must not be empty".to_string());
        }
        if input.title.chars().count() > MAX_TITLE_LEN {
            errors.push(format!("title must not exceed {MAX_TITLE_LEN} characters"));
        }
        if input.content.trim().is_empty() {
            errors.push("content must not be empty".to_string());
        }
        if input.content.chars().count() > MAX_CONTENT_LEN {
            errors.push(format!("content must not exceed {MAX_CONTENT_LEN} characters"));
        }
        if input.scheduled_at.is_some_and(|at| at <= now) {
            errors.push("scheduled time must be in the future".to_string());
        }
        if input.expires_at.is_some_and(|at| at <= now) {
            errors.push("expiry time must be in the future".to_string());
        }

        ValidationReport::from_errors(errors)
    }

    // ─── Predicates ─────────────────────────────────────────

    pub fn is_status(&self, status: NotificationStatus) -> bool {
        self.status == status
    }

    pub fn is_pending(&self) -> bool {
        self.status == NotificationStatus::Pending
    }

    pub fn is_sent(&self) -> bool {
        self.status == NotificationStatus::Sent
    }

    pub fn is_failed(&self) -> bool {
        self.status == NotificationStatus::Failed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == NotificationStatus::Cancelled
    }

    /// Checked on read; nothing sweeps expired notifications.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority >= Priority::High
    }

    pub fn is_urgent(&self) -> bool {
        self.priority == Priority::Urgent
    }

    /// Advisory send gate: true when unscheduled or the scheduled time
    /// has elapsed. An external scheduler polls this; nothing in the
    /// aggregate arms timers.
    pub fn should_send_immediately(&self) -> bool {
        match self.scheduled_at {
            Some(at) => Utc::now() >= at,
            None => true,
        }
    }

    // ─── Channels ───────────────────────────────────────────

    pub fn channel(&self, kind: ChannelKind) -> Option<&ChannelRecord> {
        self.channels.iter().find(|c| c.channel == kind)
    }

    pub fn channel_mut(&mut self, kind: ChannelKind) -> Option<&mut ChannelRecord> {
        self.channels.iter_mut().find(|c| c.channel == kind)
    }

    pub fn is_channel_enabled(&self, kind: ChannelKind) -> bool {
        self.channel(kind).is_some_and(|c| c.enabled)
    }

    pub fn is_channel_delivered(&self, kind: ChannelKind) -> bool {
        self.channel(kind).is_some_and(|c| c.is_sent())
    }

    /// Enable a transport, creating its record on first use. The record
    /// survives later disabling — transports are soft-disabled, never
    /// removed.
    pub fn enable_channel(
        &mut self,
        kind: ChannelKind,
        address: Option<&str>,
        payload: Option<ChannelPayload>,
    ) {
        if self.channel(kind).is_none() {
            let record = ChannelRecord::new(&self.id, kind);
            self.channels.push(record);
        }
        if let Some(record) = self.channel_mut(kind) {
            record.enabled = true;
            if let Some(address) = address {
                record.address = Some(address.to_string());
            }
            if payload.is_some() {
                record.payload = payload;
            }
        }
    }

    pub fn disable_channel(&mut self, kind: ChannelKind) {
        if let Some(record) = self.channel_mut(kind) {
            record.enabled = false;
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────

    /// pending → sent. When a transport is named, its record jumps to
    /// delivered.
    pub fn mark_as_sent(&mut self, channel: Option<ChannelKind>) {
        if self.guard_cancelled("mark_as_sent") {
            return;
        }
        self.status = NotificationStatus::Sent;
        self.sent_at = Some(Utc::now());

        if let Some(kind) = channel
            && let Some(record) = self.channel_mut(kind)
        {
            record.mark_as_delivered(None);
        }
    }

    /// → failed. Propagates into the named channel's record (which
    /// advances its own retry clock) and tallies the failure.
    pub fn mark_as_failed(&mut self, error: &str, channel: Option<ChannelKind>) {
        if self.guard_cancelled("mark_as_failed") {
            return;
        }
        self.status = NotificationStatus::Failed;

        if let Some(kind) = channel
            && let Some(record) = self.channel_mut(kind)
        {
            record.mark_as_failed(error);
        }

        let key = channel.map(|k| k.as_str()).unwrap_or(UNATTRIBUTED_CHANNEL);
        self.stats.record_send_attempt(key, false, Some(error));
    }

    /// An attempt is in flight on the named transport.
    pub fn mark_channel_sending(&mut self, kind: ChannelKind) {
        if self.guard_cancelled("mark_channel_sending") {
            return;
        }
        if let Some(record) = self.channel_mut(kind) {
            record.mark_as_sending();
        }
    }

    /// The named transport confirmed delivery; the success is tallied
    /// and the aggregate moves to delivered if it was merely sent.
    pub fn mark_channel_delivered(&mut self, kind: ChannelKind, message_id: Option<&str>) {
        if self.guard_cancelled("mark_channel_delivered") {
            return;
        }
        if let Some(record) = self.channel_mut(kind) {
            record.mark_as_delivered(message_id);
            self.stats.record_send_attempt(kind.as_str(), true, None);
            if self.status == NotificationStatus::Sent {
                self.status = NotificationStatus::Delivered;
            }
        }
    }

    /// Mark read. Idempotent: a second call changes nothing, and a
    /// cancelled notification stays cancelled.
    pub fn mark_as_read(&mut self) {
        if self.guard_cancelled("mark_as_read") {
            return;
        }
        if self.is_read {
            return;
        }
        self.is_read = true;
        self.read_at = Some(Utc::now());
        self.status = NotificationStatus::Read;
    }

    /// Revert a read notification to delivered. Never reverts from
    /// failed or cancelled.
    pub fn mark_as_unread(&mut self) {
        self.is_read = false;
        self.read_at = None;
        if self.status == NotificationStatus::Read {
            self.status = NotificationStatus::Delivered;
        }
    }

    /// Terminal. No un-cancel exists.
    pub fn cancel(&mut self) {
        if self.is_cancelled() {
            return;
        }
        tracing::debug!(notification = %self.id, "notification cancelled");
        self.status = NotificationStatus::Cancelled;
    }

    /// Postpone a not-yet-sent notification: set the schedule and force
    /// the status back to pending.
    pub fn schedule(&mut self, scheduled_at: DateTime<Utc>) {
        if self.guard_cancelled("schedule") {
            return;
        }
        self.scheduled_at = Some(scheduled_at);
        self.status = NotificationStatus::Pending;
    }

    /// Not re-validated against the clock; see `validate`.
    pub fn set_expiration(&mut self, expires_at: DateTime<Utc>) {
        self.expires_at = Some(expires_at);
    }

    // ─── Retry ──────────────────────────────────────────────

    /// True when failed and the delivery config still allows attempts.
    /// The external worker calls `increment_retry_attempt` and
    /// re-enqueues when this holds.
    pub fn should_retry(&self) -> bool {
        self.is_failed() && self.config.can_retry()
    }

    pub fn increment_retry_attempt(&mut self) {
        self.config.increment_retry_attempt();
    }

    // ─── Engagement ─────────────────────────────────────────

    /// A user viewed the rendered notification. Tallies the open and
    /// flips the read flag.
    pub fn record_open(&mut self) {
        self.stats.record_open();
        if !self.is_read {
            self.mark_as_read();
        }
    }

    /// A user interacted with the notification. A click on a
    /// never-opened notification records the implied open too.
    pub fn record_click(&mut self) {
        self.stats.record_click();
        if !self.is_read {
            self.mark_as_read();
        }
    }

    // ─── Tags & data ────────────────────────────────────────

    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Merge structured data into the payload.
    pub fn set_data(&mut self, patch: NotificationData) {
        match &mut self.data {
            Some(data) => data.merge(patch),
            None => self.data = Some(patch),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.url.as_deref())
    }

    pub fn deep_link(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.deep_link.as_deref())
    }

    // ─── Internal ───────────────────────────────────────────

    fn guard_cancelled(&self, operation: &str) -> bool {
        if self.is_cancelled() {
            tracing::debug!(
                notification = %self.id,
                operation,
                "ignoring mutation of cancelled notification"
            );
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::types::ChannelStatus;
    use chrono::Duration;

    fn plain(user: &str) -> Notification {
        Notification::create(NewNotification {
            user_id: user.to_string(),
            kind: Some(NotificationKind::Comment),
            title: "New comment".to_string(),
            content: "Someone replied to your thread".to_string(),
            ..NewNotification::default()
        })
        .unwrap()
    }

    #[test]
    fn test_create_defaults() {
        let n = plain("u1");
        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.priority, Priority::Normal);
        assert!(!n.is_read);
        assert!(n.channels.is_empty());
        assert_eq!(n.config.notification_id, n.id);
        assert_eq!(n.stats.notification_id, n.id);
    }

    #[test]
    fn test_validation_accumulates_all_errors() {
        let report = Notification::validate(&NewNotification {
            user_id: "u1".to_string(),
            title: String::new(),
            content: "x".repeat(6_000),
            ..NewNotification::default()
        });
        assert!(!report.valid);
        assert!(report.errors.len() >= 2);
    }

    #[test]
    fn test_create_rejects_past_schedule() {
        let err = Notification::create(NewNotification {
            user_id: "u1".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            scheduled_at: Some(Utc::now() - Duration::minutes(5)),
            ..NewNotification::default()
        })
        .unwrap_err();
        assert!(matches!(err, BeaconError::Validation(_)));
    }

    #[test]
    fn test_read_is_idempotent() {
        let mut n = plain("u1");
        n.mark_as_read();
        let stamped = n.read_at;
        assert!(n.is_read);
        assert_eq!(n.status, NotificationStatus::Read);

        n.mark_as_read();
        assert_eq!(n.read_at, stamped);
        assert!(n.is_read);
        assert_eq!(n.status, NotificationStatus::Read);
    }

    #[test]
    fn test_unread_only_reverts_from_read() {
        let mut n = plain("u1");
        n.mark_as_read();
        n.mark_as_unread();
        assert!(!n.is_read);
        assert!(n.read_at.is_none());
        assert_eq!(n.status, NotificationStatus::Delivered);

        let mut n = plain("u2");
        n.mark_as_failed("boom", None);
        n.mark_as_unread();
        assert_eq!(n.status, NotificationStatus::Failed);
    }

    #[test]
    fn test_cancel_blocks_further_lifecycle() {
        let mut n = plain("u1");
        n.cancel();
        assert!(n.is_cancelled());

        n.mark_as_sent(None);
        n.mark_as_failed("late failure", None);
        n.mark_as_read();
        n.schedule(Utc::now() + Duration::hours(1));
        assert!(n.is_cancelled());
        assert!(!n.is_read);
        assert_eq!(n.stats.send_attempts, 0);
    }

    #[test]
    fn test_schedule_resets_to_pending() {
        let mut n = plain("u1");
        n.mark_as_sent(None);
        assert!(n.is_sent());

        n.schedule(Utc::now() + Duration::hours(2));
        assert!(n.is_pending());
        assert!(!n.should_send_immediately());
    }

    #[test]
    fn test_should_send_immediately() {
        let n = plain("u1");
        assert!(n.should_send_immediately());

        let mut n = plain("u2");
        n.schedule(Utc::now() + Duration::hours(1));
        assert!(!n.should_send_immediately());
    }

    #[test]
    fn test_failure_propagates_to_channel_and_stats() {
        let mut n = plain("u1");
        n.enable_channel(ChannelKind::Email, Some("user@example.com"), None);

        n.mark_as_failed("SMTP timeout", Some(ChannelKind::Email));
        assert!(n.is_failed());

        let record = n.channel(ChannelKind::Email).unwrap();
        assert_eq!(record.status, ChannelStatus::Failed);
        assert_eq!(record.retry_count, 1);
        assert_eq!(n.stats.send_errors, 1);
        assert_eq!(n.stats.channel_stats["email"].failures, 1);
    }

    #[test]
    fn test_unattributed_failure_uses_unknown_key() {
        let mut n = plain("u1");
        n.mark_as_failed("queue exploded", None);
        assert_eq!(n.stats.channel_stats["unknown"].failures, 1);
    }

    #[test]
    fn test_retry_flow() {
        let mut n = plain("u1");
        assert!(!n.should_retry()); // not failed, no policy

        n.mark_as_failed("provider 500", None);
        assert!(!n.should_retry()); // failed, but no retry policy yet

        n.increment_retry_attempt(); // installs defaults, attempt = 1
        assert!(n.should_retry());
        assert!(n.config.retry.as_ref().unwrap().next_retry_at.is_some());
    }

    #[test]
    fn test_open_marks_read() {
        let mut n = plain("u1");
        n.record_open();
        assert_eq!(n.stats.open_count, 1);
        assert!(n.is_read);
        assert_eq!(n.status, NotificationStatus::Read);
    }

    #[test]
    fn test_click_implies_open_and_read() {
        let mut n = plain("u1");
        n.record_click();
        assert_eq!(n.stats.open_count, 1);
        assert_eq!(n.stats.click_count, 1);
        assert!(n.is_read);
    }

    #[test]
    fn test_enable_and_disable_channel() {
        let mut n = plain("u1");
        assert!(!n.is_channel_enabled(ChannelKind::Push));

        n.enable_channel(
            ChannelKind::Push,
            None,
            Some(ChannelPayload::Push {
                title: Some("Ping".into()),
                badge: Some(1),
                sound: None,
                icon: None,
            }),
        );
        assert!(n.is_channel_enabled(ChannelKind::Push));

        n.disable_channel(ChannelKind::Push);
        assert!(!n.is_channel_enabled(ChannelKind::Push));
        // Record survives disabling
        assert!(n.channel(ChannelKind::Push).is_some());
    }

    #[test]
    fn test_tags() {
        let mut n = plain("u1");
        n.add_tag("sprint-9");
        n.add_tag("sprint-9");
        assert_eq!(n.tags.len(), 1);
        assert!(n.has_tag("sprint-9"));
        n.remove_tag("sprint-9");
        assert!(!n.has_tag("sprint-9"));
    }

    #[test]
    fn test_set_data_merges() {
        let mut n = plain("u1");
        n.set_data(NotificationData {
            url: Some("https://app.example.com/t/42".into()),
            ..NotificationData::default()
        });
        n.set_data(NotificationData {
            deep_link: Some("app://thread/42".into()),
            ..NotificationData::default()
        });

        assert_eq!(n.url(), Some("https://app.example.com/t/42"));
        assert_eq!(n.deep_link(), Some("app://thread/42"));
    }

    #[test]
    fn test_convenience_constructors() {
        let n = Notification::create_system("u1", "Maintenance", "Tonight 22:00").unwrap();
        assert_eq!(n.kind, NotificationKind::System);

        let n = Notification::create_reminder(
            "u1",
            "Standup",
            "Daily standup in 10 minutes",
            Utc::now() + Duration::hours(1),
        )
        .unwrap();
        assert_eq!(n.kind, NotificationKind::Reminder);
        assert_eq!(n.priority, Priority::Normal);
        assert!(n.scheduled_at.is_some());

        let n = Notification::create_invitation("u1", "Join project", "You were invited", "u2")
            .unwrap();
        assert_eq!(n.kind, NotificationKind::Invitation);
        assert_eq!(n.priority, Priority::High);
        assert!(n.is_channel_enabled(ChannelKind::InApp));
        assert!(n.is_channel_enabled(ChannelKind::Email));
    }

    #[test]
    fn test_expiry() {
        let mut n = plain("u1");
        assert!(!n.is_expired());
        n.expires_at = Some(Utc::now() - Duration::seconds(1));
        assert!(n.is_expired());
    }

    // Mirrors the full worker/UI sequence: schedule-free send through
    // one email channel, a transient failure, redelivery, then a read.
    #[test]
    fn test_end_to_end_delivery_scenario() {
        let mut n = Notification::create(NewNotification {
            user_id: "u1".to_string(),
            kind: Some(NotificationKind::Reminder),
            title: "Weekly report due".to_string(),
            content: "Your weekly report is due on Friday".to_string(),
            priority: Some(Priority::Normal),
            channels: vec![ChannelKind::Email],
            ..NewNotification::default()
        })
        .unwrap();
        n.channel_mut(ChannelKind::Email).unwrap().address = Some("user@example.com".to_string());
        assert!(n.should_send_immediately());
        assert!(n.is_channel_enabled(ChannelKind::Email));

        let record = n.channel_mut(ChannelKind::Email).unwrap();
        record.mark_as_sending();
        assert_eq!(record.status, ChannelStatus::Sending);

        record.mark_as_failed("SMTP timeout");
        assert_eq!(record.status, ChannelStatus::Failed);
        assert_eq!(record.retry_count, 1);
        let next = record.next_retry_at.unwrap();
        let delta = next - Utc::now();
        assert!(delta >= Duration::minutes(9) && delta <= Duration::minutes(10));
        assert!(record.can_retry(3));

        record.mark_as_delivered(Some("msg-123"));
        assert_eq!(record.status, ChannelStatus::Delivered);
        assert!(record.error.is_none());
        assert_eq!(record.retry_count, 1);

        n.record_open();
        assert_eq!(n.stats.open_count, 1);
        assert!(n.is_read);
        assert_eq!(n.status, NotificationStatus::Read);
    }
}
