//! # Beacon
//!
//! Multi-channel notification delivery tracker: lifecycle state,
//! per-channel retry/backoff bookkeeping, and engagement statistics.
//!
//! ## Architecture
//! ```text
//! Notification (pending → sent → delivered → read | failed | cancelled)
//!   ├── ChannelRecord × N  — per-transport status machine + retry clock
//!   ├── DeliveryConfig     — retry/batch/template/tracking/rate-limit policy
//!   └── DeliveryStats      — attempts, opens, clicks, engagement score
//!
//! NotificationDb — the aggregate persisted as one SQLite transaction;
//! external workers poll `due_notifications` / `retry_due_channels`.
//! ```
//!
//! Beacon tracks delivery state; it does not send. Transports, queues,
//! and schedulers are external collaborators driving the API.

pub use beacon_core::{
    BackoffStrategy, BeaconConfig, BeaconError, ChannelKind, ChannelStatus, NotificationKind,
    NotificationStatus, Priority, Result, ValidationReport,
};
pub use beacon_model::{
    ChannelPayload, ChannelRecord, ChannelTally, DeliveryConfig, DeliveryStats, NewNotification,
    Notification, NotificationData, Performance, RetryPolicy, StatsReport, UserBehavior,
};
pub use beacon_store::NotificationDb;
