//! Domain enums shared by the model and store crates.
//!
//! Every enum serializes to the wire/storage spelling via serde and
//! exposes `as_str`/`parse` for the SQLite layer, which stores plain
//! TEXT columns.

use serde::{Deserialize, Serialize};

/// Delivery transport for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelKind {
    InApp,
    Email,
    Sms,
    Push,
    /// Instant-messaging apps (bots, official accounts).
    Im,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::InApp,
        ChannelKind::Email,
        ChannelKind::Sms,
        ChannelKind::Push,
        ChannelKind::Im,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::InApp => "inApp",
            ChannelKind::Email => "email",
            ChannelKind::Sms => "sms",
            ChannelKind::Push => "push",
            ChannelKind::Im => "im",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inApp" => Some(ChannelKind::InApp),
            "email" => Some(ChannelKind::Email),
            "sms" => Some(ChannelKind::Sms),
            "push" => Some(ChannelKind::Push),
            "im" => Some(ChannelKind::Im),
            _ => None,
        }
    }

    /// Human-readable name for dashboards and CLI output.
    pub fn display_name(&self) -> &'static str {
        match self {
            ChannelKind::InApp => "In-app notification",
            ChannelKind::Email => "Email",
            ChannelKind::Sms => "SMS",
            ChannelKind::Push => "Push notification",
            ChannelKind::Im => "Instant messaging",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "normal" => Some(Priority::Normal),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    System,
    Project,
    Requirement,
    Prototype,
    Material,
    Comment,
    Mention,
    Assignment,
    Deadline,
    Approval,
    Security,
    Update,
    Reminder,
    Welcome,
    Invitation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::System => "system",
            NotificationKind::Project => "project",
            NotificationKind::Requirement => "requirement",
            NotificationKind::Prototype => "prototype",
            NotificationKind::Material => "material",
            NotificationKind::Comment => "comment",
            NotificationKind::Mention => "mention",
            NotificationKind::Assignment => "assignment",
            NotificationKind::Deadline => "deadline",
            NotificationKind::Approval => "approval",
            NotificationKind::Security => "security",
            NotificationKind::Update => "update",
            NotificationKind::Reminder => "reminder",
            NotificationKind::Welcome => "welcome",
            NotificationKind::Invitation => "invitation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(NotificationKind::System),
            "project" => Some(NotificationKind::Project),
            "requirement" => Some(NotificationKind::Requirement),
            "prototype" => Some(NotificationKind::Prototype),
            "material" => Some(NotificationKind::Material),
            "comment" => Some(NotificationKind::Comment),
            "mention" => Some(NotificationKind::Mention),
            "assignment" => Some(NotificationKind::Assignment),
            "deadline" => Some(NotificationKind::Deadline),
            "approval" => Some(NotificationKind::Approval),
            "security" => Some(NotificationKind::Security),
            "update" => Some(NotificationKind::Update),
            "reminder" => Some(NotificationKind::Reminder),
            "welcome" => Some(NotificationKind::Welcome),
            "invitation" => Some(NotificationKind::Invitation),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of the notification aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
    Cancelled,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::Read => "read",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(NotificationStatus::Pending),
            "sent" => Some(NotificationStatus::Sent),
            "delivered" => Some(NotificationStatus::Delivered),
            "read" => Some(NotificationStatus::Read),
            "failed" => Some(NotificationStatus::Failed),
            "cancelled" => Some(NotificationStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery status of a single channel attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Pending,
    Sending,
    Delivered,
    Failed,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Pending => "pending",
            ChannelStatus::Sending => "sending",
            ChannelStatus::Delivered => "delivered",
            ChannelStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ChannelStatus::Pending),
            "sending" => Some(ChannelStatus::Sending),
            "delivered" => Some(ChannelStatus::Delivered),
            "failed" => Some(ChannelStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How retry delays grow between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Linear,
    Exponential,
    Fixed,
}

impl BackoffStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackoffStrategy::Linear => "linear",
            BackoffStrategy::Exponential => "exponential",
            BackoffStrategy::Fixed => "fixed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "linear" => Some(BackoffStrategy::Linear),
            "exponential" => Some(BackoffStrategy::Exponential),
            "fixed" => Some(BackoffStrategy::Fixed),
            _ => None,
        }
    }
}

/// Outcome of a validation pass. Accumulates every violated rule instead
/// of failing fast so a caller can surface all problems at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Build a report from collected rule violations.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self { valid: errors.is_empty(), errors }
    }

    pub fn ok() -> Self {
        Self { valid: true, errors: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_kind_round_trip() {
        for kind in ChannelKind::ALL {
            assert_eq!(ChannelKind::parse(kind.as_str()), Some(kind));
        }
        assert!(ChannelKind::parse("carrier-pigeon").is_none());
    }

    #[test]
    fn test_channel_kind_serde_spelling() {
        let json = serde_json::to_string(&ChannelKind::InApp).unwrap();
        assert_eq!(json, "\"inApp\"");
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            NotificationStatus::parse("cancelled"),
            Some(NotificationStatus::Cancelled)
        );
        assert_eq!(ChannelStatus::parse("sending"), Some(ChannelStatus::Sending));
        assert!(NotificationStatus::parse("archived").is_none());
    }

    #[test]
    fn test_validation_report() {
        let report = ValidationReport::from_errors(vec![]);
        assert!(report.valid);
        let report = ValidationReport::from_errors(vec!["title is empty".into()]);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
    }
}
