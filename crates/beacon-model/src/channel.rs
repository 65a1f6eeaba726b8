//! Channel records — one delivery attempt tracker per transport.
//!
//! Each record runs its own status machine (pending → sending →
//! delivered | failed) and its own retry clock. Records are never
//! deleted while the parent notification exists; a disabled transport
//! is tracked with `enabled = false` instead.

use beacon_core::types::{ChannelKind, ChannelStatus, ValidationReport};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Retry ceiling used when the delivery worker passes no explicit limit.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base unit of the per-channel backoff clock, in minutes.
const BACKOFF_BASE_MINUTES: i64 = 5;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
}

fn mobile_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^1[3-9]\d{9}$").expect("mobile pattern"))
}

/// Channel-specific delivery payload — one shape per transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "camelCase")]
pub enum ChannelPayload {
    InApp,
    Email {
        #[serde(default)]
        subject: Option<String>,
        #[serde(default)]
        template: Option<String>,
        #[serde(default)]
        attachments: Vec<String>,
    },
    Sms {
        #[serde(default)]
        template: Option<String>,
        #[serde(default)]
        signature: Option<String>,
    },
    Push {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        badge: Option<u32>,
        #[serde(default)]
        sound: Option<String>,
        #[serde(default)]
        icon: Option<String>,
    },
    Im {
        #[serde(default)]
        template_id: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
}

impl ChannelPayload {
    /// The transport this payload shape belongs to.
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelPayload::InApp => ChannelKind::InApp,
            ChannelPayload::Email { .. } => ChannelKind::Email,
            ChannelPayload::Sms { .. } => ChannelKind::Sms,
            ChannelPayload::Push { .. } => ChannelKind::Push,
            ChannelPayload::Im { .. } => ChannelKind::Im,
        }
    }
}

/// One delivery attempt record for a single transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Parent notification id.
    pub notification_id: String,
    pub channel: ChannelKind,
    pub enabled: bool,
    pub status: ChannelStatus,
    /// Destination (email address, phone number, device token).
    pub address: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Message id returned by the outbound transport.
    pub message_id: Option<String>,
    /// Last failure text. Cleared on delivery and on retry reset.
    pub error: Option<String>,
    pub retry_count: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub payload: Option<ChannelPayload>,
}

impl ChannelRecord {
    /// Create an enabled, pending record for a transport.
    pub fn new(notification_id: &str, channel: ChannelKind) -> Self {
        Self {
            notification_id: notification_id.to_string(),
            channel,
            enabled: true,
            status: ChannelStatus::Pending,
            address: None,
            sent_at: None,
            delivered_at: None,
            message_id: None,
            error: None,
            retry_count: 0,
            next_retry_at: None,
            payload: None,
        }
    }

    /// Builder: set the destination address.
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Builder: set the channel-specific payload.
    pub fn with_payload(mut self, payload: ChannelPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Whether the transport confirmed delivery.
    pub fn is_sent(&self) -> bool {
        self.status == ChannelStatus::Delivered
    }

    pub fn is_failed(&self) -> bool {
        self.status == ChannelStatus::Failed
    }

    /// True iff failed and still under the retry ceiling.
    pub fn can_retry(&self, max_retries: u32) -> bool {
        self.status == ChannelStatus::Failed && self.retry_count < max_retries
    }

    /// An attempt is in flight.
    pub fn mark_as_sending(&mut self) {
        self.status = ChannelStatus::Sending;
        self.sent_at = Some(Utc::now());
    }

    /// The transport confirmed delivery.
    pub fn mark_as_delivered(&mut self, message_id: Option<&str>) {
        self.status = ChannelStatus::Delivered;
        self.delivered_at = Some(Utc::now());
        if let Some(id) = message_id {
            self.message_id = Some(id.to_string());
        }
        self.error = None;
    }

    /// The attempt failed. Increments the retry counter and, while the
    /// ceiling allows another attempt, schedules the next one at
    /// now + 5 × 2^retry_count minutes (10, 20, 40, 80 …). Once the
    /// ceiling is hit the counter keeps growing but the clock stops
    /// advancing; the last computed time is left in place.
    pub fn mark_as_failed(&mut self, error: &str) {
        self.status = ChannelStatus::Failed;
        self.error = Some(error.to_string());
        self.retry_count += 1;

        if self.can_retry(DEFAULT_MAX_RETRIES) {
            let backoff_minutes = BACKOFF_BASE_MINUTES * (1_i64 << self.retry_count);
            self.next_retry_at = Some(Utc::now() + Duration::minutes(backoff_minutes));
        }
    }

    /// Operator override: wipe retry bookkeeping for a fresh attempt.
    pub fn reset_retry(&mut self) {
        self.retry_count = 0;
        self.next_retry_at = None;
        self.error = None;
    }

    pub fn display_name(&self) -> &'static str {
        self.channel.display_name()
    }

    /// Accumulating validation: parent id present, address format matches
    /// the transport, payload shape matches the transport.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();

        if self.notification_id.trim().is_empty() {
            errors.push("notification id must not be empty".to_string());
        }

        if self.channel == ChannelKind::Email
            && let Some(address) = &self.address
            && !email_regex().is_match(address)
        {
            errors.push("email address format is invalid".to_string());
        }

        if self.channel == ChannelKind::Sms
            && let Some(address) = &self.address
            && !mobile_regex().is_match(address)
        {
            errors.push("mobile number format is invalid".to_string());
        }

        if let Some(payload) = &self.payload
            && payload.kind() != self.channel
        {
            errors.push(format!(
                "payload shape '{}' does not match channel '{}'",
                payload.kind(),
                self.channel
            ));
        }

        ValidationReport::from_errors(errors)
    }
}
