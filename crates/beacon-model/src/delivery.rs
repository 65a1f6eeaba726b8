//! Per-notification delivery policy.
//!
//! One `DeliveryConfig` per notification. Sub-policies are optional;
//! an absent sub-policy means "feature off" except for retry, where
//! `increment_retry_attempt` installs the defaults on first use.
//!
//! This clock is the notification-level re-enqueue schedule. It is
//! independent of the per-channel clock in `ChannelRecord` — the two
//! are deliberately not unified.

use beacon_core::types::{BackoffStrategy, ChannelKind, ValidationReport};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const FIXED_BACKOFF_MS: i64 = 5 * 60_000;

/// Retry sub-policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub current_attempt: u32,
    #[serde(default)]
    pub next_retry_at: Option<DateTime<Utc>>,
    pub backoff_multiplier: f64,
    pub backoff_strategy: BackoffStrategy,
    /// Restrict retries to these transports; empty means all.
    #[serde(default)]
    pub retry_channels: Vec<ChannelKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            current_attempt: 0,
            next_retry_at: None,
            backoff_multiplier: 2.0,
            backoff_strategy: BackoffStrategy::Exponential,
            retry_channels: Vec::new(),
        }
    }
}

/// Batch-send sub-policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchPolicy {
    pub enabled: bool,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub batch_size: Option<u32>,
    #[serde(default)]
    pub batch_index: Option<u32>,
    #[serde(default)]
    pub total_batches: Option<u32>,
    /// Delay between batches, in milliseconds.
    #[serde(default)]
    pub delay_between_batches_ms: Option<u64>,
    /// Batch priority weight.
    #[serde(default)]
    pub priority: Option<i32>,
}

/// Template sub-policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatePolicy {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub fallback_template: Option<String>,
    #[serde(default)]
    pub custom: Option<CustomTemplate>,
}

/// Inline template override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomTemplate {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

/// Personalization sub-policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Personalization {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub time_format: Option<String>,
    #[serde(default)]
    pub number_format: Option<String>,
}

/// Open/click tracking sub-policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingPolicy {
    pub enabled: bool,
    #[serde(default)]
    pub track_open: bool,
    #[serde(default)]
    pub track_click: bool,
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub pixel_url: Option<String>,
    #[serde(default)]
    pub analytics_provider: Option<String>,
    #[serde(default)]
    pub custom_events: Vec<String>,
}

/// Rate-limit sub-policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub enabled: bool,
    #[serde(default)]
    pub max_per_minute: Option<u32>,
    #[serde(default)]
    pub max_per_hour: Option<u32>,
    #[serde(default)]
    pub max_per_day: Option<u32>,
    #[serde(default)]
    pub burst_limit: Option<u32>,
    /// Sliding window size, in seconds.
    #[serde(default)]
    pub window_size_secs: Option<u32>,
}

/// Effective rate-limit caps after defaults are applied.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RateLimitSnapshot {
    pub max_per_minute: u32,
    pub max_per_hour: u32,
    pub max_per_day: u32,
}

/// Encryption or signature settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CipherPolicy {
    pub enabled: bool,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub key_id: Option<String>,
}

/// Content-filter rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentFilter {
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Security sub-policy. Declarative only — nothing here encrypts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityPolicy {
    #[serde(default)]
    pub encryption: Option<CipherPolicy>,
    #[serde(default)]
    pub signature: Option<CipherPolicy>,
    #[serde(default)]
    pub ip_whitelist: Vec<String>,
    #[serde(default)]
    pub user_agent_filter: Vec<String>,
    #[serde(default)]
    pub content_filter: Option<ContentFilter>,
}

/// Per-notification delivery policy, 1:1 with a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub notification_id: String,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    #[serde(default)]
    pub batch: Option<BatchPolicy>,
    #[serde(default)]
    pub template: Option<TemplatePolicy>,
    #[serde(default)]
    pub personalization: Option<Personalization>,
    #[serde(default)]
    pub tracking: Option<TrackingPolicy>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitPolicy>,
    #[serde(default)]
    pub security: Option<SecurityPolicy>,
}

impl DeliveryConfig {
    pub fn new(notification_id: &str) -> Self {
        Self {
            notification_id: notification_id.to_string(),
            retry: None,
            batch: None,
            template: None,
            personalization: None,
            tracking: None,
            rate_limit: None,
            security: None,
        }
    }

    // ─── Retry ──────────────────────────────────────────────

    pub fn is_retry_enabled(&self) -> bool {
        self.retry.as_ref().is_some_and(|r| r.enabled)
    }

    /// Sole gate for notification-level retries: enabled and under the
    /// attempt ceiling.
    pub fn can_retry(&self) -> bool {
        match &self.retry {
            Some(r) => r.enabled && r.current_attempt < r.max_attempts,
            None => false,
        }
    }

    /// Next re-enqueue time, or None when retries are exhausted/off.
    ///
    /// Delay per strategy, with `n = current_attempt`:
    /// linear `(n+1)` minutes, exponential `multiplier^n` minutes,
    /// fixed 5 minutes.
    pub fn calculate_next_retry_time(&self) -> Option<DateTime<Utc>> {
        if !self.can_retry() {
            return None;
        }
        let retry = self.retry.as_ref()?;

        let delay_ms = match retry.backoff_strategy {
            BackoffStrategy::Linear => (retry.current_attempt as i64 + 1) * 60_000,
            BackoffStrategy::Exponential => {
                (retry.backoff_multiplier.powi(retry.current_attempt as i32) * 60_000.0) as i64
            }
            BackoffStrategy::Fixed => FIXED_BACKOFF_MS,
        };

        Some(Utc::now() + Duration::milliseconds(delay_ms))
    }

    /// Count an attempt and recompute the re-enqueue clock. Installs the
    /// default retry policy on first use.
    pub fn increment_retry_attempt(&mut self) {
        let retry = self.retry.get_or_insert_with(RetryPolicy::default);
        retry.current_attempt += 1;
        let next = self.calculate_next_retry_time();
        if let Some(retry) = &mut self.retry {
            retry.next_retry_at = next;
        }
    }

    pub fn reset_retry(&mut self) {
        if let Some(retry) = &mut self.retry {
            retry.current_attempt = 0;
            retry.next_retry_at = None;
        }
    }

    // ─── Batch ──────────────────────────────────────────────

    pub fn is_batch_enabled(&self) -> bool {
        self.batch.as_ref().is_some_and(|b| b.enabled)
    }

    /// Inter-batch delay in milliseconds (0 when unset).
    pub fn batch_delay_ms(&self) -> u64 {
        self.batch
            .as_ref()
            .and_then(|b| b.delay_between_batches_ms)
            .unwrap_or(0)
    }

    // ─── Tracking ───────────────────────────────────────────

    pub fn is_tracking_enabled(&self) -> bool {
        self.tracking.as_ref().is_some_and(|t| t.enabled)
    }

    pub fn should_track_open(&self) -> bool {
        self.is_tracking_enabled() && self.tracking.as_ref().is_some_and(|t| t.track_open)
    }

    pub fn should_track_click(&self) -> bool {
        self.is_tracking_enabled() && self.tracking.as_ref().is_some_and(|t| t.track_click)
    }

    // ─── Template ───────────────────────────────────────────

    pub fn template_variables(&self) -> HashMap<String, serde_json::Value> {
        self.template
            .as_ref()
            .map(|t| t.variables.clone())
            .unwrap_or_default()
    }

    pub fn set_template_variable(&mut self, key: &str, value: serde_json::Value) {
        self.template
            .get_or_insert_with(TemplatePolicy::default)
            .variables
            .insert(key.to_string(), value);
    }

    // ─── Personalization ────────────────────────────────────

    pub fn language(&self) -> &str {
        self.personalization
            .as_ref()
            .and_then(|p| p.language.as_deref())
            .unwrap_or("en-US")
    }

    pub fn timezone(&self) -> &str {
        self.personalization
            .as_ref()
            .and_then(|p| p.timezone.as_deref())
            .unwrap_or("UTC")
    }

    // ─── Security ───────────────────────────────────────────

    /// An empty whitelist admits every address.
    pub fn is_ip_whitelisted(&self, ip: &str) -> bool {
        match self.security.as_ref().map(|s| &s.ip_whitelist) {
            Some(list) if !list.is_empty() => list.iter().any(|entry| entry == ip),
            _ => true,
        }
    }

    pub fn is_encryption_enabled(&self) -> bool {
        self.security
            .as_ref()
            .and_then(|s| s.encryption.as_ref())
            .is_some_and(|c| c.enabled)
    }

    pub fn is_signature_enabled(&self) -> bool {
        self.security
            .as_ref()
            .and_then(|s| s.signature.as_ref())
            .is_some_and(|c| c.enabled)
    }

    // ─── Rate limit ─────────────────────────────────────────

    /// Effective caps with defaults of 60/min, 1000/hour, 10000/day.
    pub fn rate_limit(&self) -> RateLimitSnapshot {
        let policy = self.rate_limit.as_ref();
        RateLimitSnapshot {
            max_per_minute: policy.and_then(|r| r.max_per_minute).unwrap_or(60),
            max_per_hour: policy.and_then(|r| r.max_per_hour).unwrap_or(1_000),
            max_per_day: policy.and_then(|r| r.max_per_day).unwrap_or(10_000),
        }
    }

    // ─── Validation ─────────────────────────────────────────

    /// Numeric sanity checks. Accumulates all violations.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();

        if self.notification_id.trim().is_empty() {
            errors.push("notification id must not be empty".to_string());
        }

        if let Some(retry) = &self.retry {
            if retry.max_attempts < 1 {
                errors.push("retry max attempts must be at least 1".to_string());
            }
            if retry.backoff_multiplier < 1.0 {
                errors.push("backoff multiplier must be at least 1".to_string());
            }
        }

        if let Some(batch) = &self.batch
            && let Some(size) = batch.batch_size
            && size < 1
        {
            errors.push("batch size must be at least 1".to_string());
        }

        if let Some(limit) = &self.rate_limit {
            if limit.max_per_minute.is_some_and(|n| n < 1) {
                errors.push("per-minute cap must be at least 1".to_string());
            }
            if limit.max_per_hour.is_some_and(|n| n < 1) {
                errors.push("per-hour cap must be at least 1".to_string());
            }
            if limit.max_per_day.is_some_and(|n| n < 1) {
                errors.push("per-day cap must be at least 1".to_string());
            }
        }

        ValidationReport::from_errors(errors)
    }
}
