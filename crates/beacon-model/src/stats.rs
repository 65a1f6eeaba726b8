//! Delivery statistics — the event recorder for one notification.
//!
//! Counters and timestamps are stored; rates and the engagement score
//! are derived on read and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Channel key used when a failure cannot be attributed to a transport.
pub const UNATTRIBUTED_CHANNEL: &str = "unknown";

/// Per-channel attempt tally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelTally {
    pub attempts: u32,
    pub successes: u32,
    pub failures: u32,
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Average delivery latency in milliseconds, fed by the worker.
    #[serde(default)]
    pub avg_delivery_time_ms: Option<u64>,
    /// failures / attempts, recomputed on every recorded attempt.
    pub error_rate: f64,
}

/// User-behavior metadata reported by the UI layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserBehavior {
    /// Reading time in seconds.
    #[serde(default)]
    pub read_time_secs: Option<u32>,
    #[serde(default)]
    pub interaction_count: Option<u32>,
    #[serde(default)]
    pub share_count: Option<u32>,
    #[serde(default)]
    pub dismiss_count: Option<u32>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

macro_rules! merge_fields {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(if $src.$field.is_some() { $dst.$field = $src.$field; })+
    };
}

impl UserBehavior {
    /// Overlay the set fields of `patch` onto self.
    fn merge(&mut self, patch: UserBehavior) {
        merge_fields!(
            self, patch,
            read_time_secs, interaction_count, share_count, dismiss_count,
            platform, browser, os, country, region, city,
        );
    }
}

/// Delivery-pipeline timing samples, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Performance {
    #[serde(default)]
    pub delivery_time_ms: Option<u64>,
    #[serde(default)]
    pub render_time_ms: Option<u64>,
    #[serde(default)]
    pub load_time_ms: Option<u64>,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
}

impl Performance {
    fn merge(&mut self, patch: Performance) {
        merge_fields!(
            self, patch,
            delivery_time_ms, render_time_ms, load_time_ms, response_time_ms,
        );
    }
}

/// Statistics aggregator, 1:1 with a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub notification_id: String,
    pub send_attempts: u32,
    pub send_errors: u32,
    #[serde(default)]
    pub last_send_error: Option<String>,
    pub open_count: u32,
    pub click_count: u32,
    #[serde(default)]
    pub first_open_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_open_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_click_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_click_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub channel_stats: HashMap<String, ChannelTally>,
    #[serde(default)]
    pub user_behavior: UserBehavior,
    #[serde(default)]
    pub performance: Performance,
}

impl DeliveryStats {
    pub fn new(notification_id: &str) -> Self {
        Self {
            notification_id: notification_id.to_string(),
            send_attempts: 0,
            send_errors: 0,
            last_send_error: None,
            open_count: 0,
            click_count: 0,
            first_open_at: None,
            last_open_at: None,
            first_click_at: None,
            last_click_at: None,
            channel_stats: HashMap::new(),
            user_behavior: UserBehavior::default(),
            performance: Performance::default(),
        }
    }

    /// Count one send attempt against the global and per-channel tallies
    /// and recompute that channel's error rate.
    pub fn record_send_attempt(&mut self, channel: &str, success: bool, error: Option<&str>) {
        self.send_attempts += 1;
        if !success {
            self.send_errors += 1;
            if let Some(message) = error {
                self.last_send_error = Some(message.to_string());
            }
        }

        let tally = self.channel_stats.entry(channel.to_string()).or_default();
        tally.attempts += 1;
        tally.last_attempt_at = Some(Utc::now());
        if success {
            tally.successes += 1;
        } else {
            tally.failures += 1;
        }
        tally.error_rate = f64::from(tally.failures) / f64::from(tally.attempts);
    }

    /// Count one open; first-open is stamped once, last-open always.
    pub fn record_open(&mut self) {
        let now = Utc::now();
        self.open_count += 1;
        if self.first_open_at.is_none() {
            self.first_open_at = Some(now);
        }
        self.last_open_at = Some(now);
    }

    /// Count one click. A click on a never-opened notification implies
    /// an unrecorded open, so one is recorded first at the same instant.
    pub fn record_click(&mut self) {
        let now = Utc::now();
        if self.open_count == 0 {
            self.open_count = 1;
            self.first_open_at = Some(now);
            self.last_open_at = Some(now);
        }
        self.click_count += 1;
        if self.first_click_at.is_none() {
            self.first_click_at = Some(now);
        }
        self.last_click_at = Some(now);
    }

    /// Overlay user-behavior fields reported by the UI.
    pub fn record_user_behavior(&mut self, behavior: UserBehavior) {
        self.user_behavior.merge(behavior);
    }

    /// Overlay pipeline timing samples.
    pub fn record_performance(&mut self, performance: Performance) {
        self.performance.merge(performance);
    }

    // ─── Derived metrics ────────────────────────────────────

    /// clicks / opens × 100.
    pub fn click_through_rate(&self) -> f64 {
        if self.open_count == 0 {
            return 0.0;
        }
        f64::from(self.click_count) / f64::from(self.open_count) * 100.0
    }

    /// (attempts − errors) / attempts × 100.
    pub fn success_rate(&self) -> f64 {
        if self.send_attempts == 0 {
            return 0.0;
        }
        f64::from(self.send_attempts - self.send_errors) / f64::from(self.send_attempts) * 100.0
    }

    pub fn channel_success_rate(&self, channel: &str) -> f64 {
        match self.channel_stats.get(channel) {
            Some(tally) if tally.attempts > 0 => {
                f64::from(tally.successes) / f64::from(tally.attempts) * 100.0
            }
            _ => 0.0,
        }
    }

    /// Average delivery latency in ms: the channel's average when one is
    /// named, otherwise the pipeline-level sample.
    pub fn average_delivery_time(&self, channel: Option<&str>) -> u64 {
        if let Some(name) = channel
            && let Some(tally) = self.channel_stats.get(name)
        {
            return tally.avg_delivery_time_ms.unwrap_or(0);
        }
        self.performance.delivery_time_ms.unwrap_or(0)
    }

    /// Either threshold met or exceeded counts as popular.
    pub fn is_popular(&self, open_threshold: u32, click_threshold: u32) -> bool {
        self.open_count >= open_threshold || self.click_count >= click_threshold
    }

    /// Weighted 0–100 engagement score: opens (≤40, 4 each), clicks
    /// (≤30, 6 each), shares (≤20, 10 each), read time (≤10, one point
    /// per 6 seconds), capped at 100.
    pub fn engagement_score(&self) -> f64 {
        let mut score = 0.0;
        score += (f64::from(self.open_count) * 4.0).min(40.0);
        score += (f64::from(self.click_count) * 6.0).min(30.0);
        if let Some(shares) = self.user_behavior.share_count {
            score += (f64::from(shares) * 10.0).min(20.0);
        }
        if let Some(read_time) = self.user_behavior.read_time_secs {
            score += (f64::from(read_time) / 6.0).min(10.0);
        }
        score.min(100.0)
    }

    /// Wipe all counters and maps back to a fresh state.
    pub fn reset(&mut self) {
        *self = Self::new(&self.notification_id.clone());
    }

    /// Read-only snapshot for analytics consumers — the sole
    /// serialization boundary for reporting.
    pub fn export_report(&self) -> StatsReport {
        StatsReport {
            basic: BasicMetrics {
                send_attempts: self.send_attempts,
                send_errors: self.send_errors,
                open_count: self.open_count,
                click_count: self.click_count,
                success_rate: self.success_rate(),
                click_through_rate: self.click_through_rate(),
                engagement_score: self.engagement_score(),
            },
            channels: self.channel_stats.clone(),
            performance: self.performance.clone(),
            user_behavior: self.user_behavior.clone(),
        }
    }
}

/// Headline counters plus the derived metrics.
#[derive(Debug, Clone, Serialize)]
pub struct BasicMetrics {
    pub send_attempts: u32,
    pub send_errors: u32,
    pub open_count: u32,
    pub click_count: u32,
    pub success_rate: f64,
    pub click_through_rate: f64,
    pub engagement_score: f64,
}

/// Exported analytics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub basic: BasicMetrics,
    pub channels: HashMap<String, ChannelTally>,
    pub performance: Performance,
    pub user_behavior: UserBehavior,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_send_attempt_tallies() {
        let mut stats = DeliveryStats::new("n1");
        stats.record_send_attempt("email", true, None);
        stats.record_send_attempt("email", false, Some("SMTP timeout"));
        stats.record_send_attempt("sms", true, None);

        assert_eq!(stats.send_attempts, 3);
        assert_eq!(stats.send_errors, 1);
        assert_eq!(stats.last_send_error.as_deref(), Some("SMTP timeout"));

        let email = &stats.channel_stats["email"];
        assert_eq!(email.attempts, 2);
        assert_eq!(email.successes, 1);
        assert_eq!(email.failures, 1);
        assert!((email.error_rate - 0.5).abs() < f64::EPSILON);
        assert!(email.last_attempt_at.is_some());
    }

    #[test]
    fn test_open_stamps_first_and_last() {
        let mut stats = DeliveryStats::new("n1");
        stats.record_open();
        let first = stats.first_open_at.unwrap();
        stats.record_open();

        assert_eq!(stats.open_count, 2);
        assert_eq!(stats.first_open_at.unwrap(), first);
        assert!(stats.last_open_at.unwrap() >= first);
    }

    #[test]
    fn test_click_implies_open() {
        let mut stats = DeliveryStats::new("n1");
        stats.record_click();

        assert_eq!(stats.open_count, 1);
        assert_eq!(stats.click_count, 1);
        assert_eq!(stats.first_open_at, stats.first_click_at);
    }

    #[test]
    fn test_click_after_open_does_not_double_count() {
        let mut stats = DeliveryStats::new("n1");
        stats.record_open();
        stats.record_click();

        assert_eq!(stats.open_count, 1);
        assert_eq!(stats.click_count, 1);
    }

    #[test]
    fn test_rates() {
        let mut stats = DeliveryStats::new("n1");
        assert_eq!(stats.click_through_rate(), 0.0);
        assert_eq!(stats.success_rate(), 0.0);

        stats.record_send_attempt("email", true, None);
        stats.record_send_attempt("email", true, None);
        stats.record_send_attempt("email", false, Some("bounce"));
        stats.record_open();
        stats.record_open();
        stats.record_click();

        assert!((stats.success_rate() - 66.666).abs() < 0.01);
        assert!((stats.click_through_rate() - 50.0).abs() < f64::EPSILON);
        assert!((stats.channel_success_rate("email") - 66.666).abs() < 0.01);
        assert_eq!(stats.channel_success_rate("push"), 0.0);
    }

    #[test]
    fn test_engagement_score_caps_at_100() {
        let mut stats = DeliveryStats::new("n1");
        stats.open_count = 100;
        stats.click_count = 100;
        stats.user_behavior.share_count = Some(100);
        stats.user_behavior.read_time_secs = Some(6_000);

        assert_eq!(stats.engagement_score(), 100.0);
    }

    #[test]
    fn test_engagement_score_partial() {
        let mut stats = DeliveryStats::new("n1");
        stats.open_count = 2; // 8 points
        stats.click_count = 1; // 6 points
        stats.user_behavior.read_time_secs = Some(12); // 2 points

        assert!((stats.engagement_score() - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_is_popular() {
        let mut stats = DeliveryStats::new("n1");
        assert!(!stats.is_popular(10, 5));
        stats.open_count = 10;
        assert!(stats.is_popular(10, 5));
        stats.open_count = 0;
        stats.click_count = 5;
        assert!(stats.is_popular(10, 5));
    }

    #[test]
    fn test_behavior_merge_keeps_existing() {
        let mut stats = DeliveryStats::new("n1");
        stats.record_user_behavior(UserBehavior {
            read_time_secs: Some(30),
            platform: Some("ios".into()),
            ..UserBehavior::default()
        });
        stats.record_user_behavior(UserBehavior {
            share_count: Some(2),
            ..UserBehavior::default()
        });

        assert_eq!(stats.user_behavior.read_time_secs, Some(30));
        assert_eq!(stats.user_behavior.platform.as_deref(), Some("ios"));
        assert_eq!(stats.user_behavior.share_count, Some(2));
    }

    #[test]
    fn test_average_delivery_time_prefers_channel() {
        let mut stats = DeliveryStats::new("n1");
        stats.performance.delivery_time_ms = Some(900);
        stats.record_send_attempt("email", true, None);
        stats
            .channel_stats
            .get_mut("email")
            .unwrap()
            .avg_delivery_time_ms = Some(350);

        assert_eq!(stats.average_delivery_time(Some("email")), 350);
        assert_eq!(stats.average_delivery_time(None), 900);
        assert_eq!(stats.average_delivery_time(Some("sms")), 900);
    }

    #[test]
    fn test_reset() {
        let mut stats = DeliveryStats::new("n1");
        stats.record_send_attempt("email", false, Some("x"));
        stats.record_click();
        stats.reset();

        assert_eq!(stats.notification_id, "n1");
        assert_eq!(stats.send_attempts, 0);
        assert_eq!(stats.click_count, 0);
        assert!(stats.channel_stats.is_empty());
        assert!(stats.last_send_error.is_none());
    }

    #[test]
    fn test_export_report() {
        let mut stats = DeliveryStats::new("n1");
        stats.record_send_attempt("email", true, None);
        stats.record_open();

        let report = stats.export_report();
        assert_eq!(report.basic.send_attempts, 1);
        assert_eq!(report.basic.open_count, 1);
        assert_eq!(report.basic.success_rate, 100.0);
        assert!(report.channels.contains_key("email"));
    }
}
