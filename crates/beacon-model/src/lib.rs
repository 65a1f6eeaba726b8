//! # Beacon Model
//!
//! The in-memory notification aggregate: one `Notification` owns its
//! `ChannelRecord`s (one per transport), a `DeliveryConfig` (retry,
//! batching, tracking, rate-limit, security policy), and `DeliveryStats`
//! (attempts, opens, clicks, engagement).
//!
//! All operations are synchronous state transitions. Mutators never fail;
//! delivery failure is data (a channel's `status = failed`), not an error.
//! Concurrency control lives at the persistence boundary — the aggregate
//! is saved and loaded as one transactional unit.
//!
//! ```text
//! Notification (lifecycle: pending → sent → delivered → read)
//!   ├── ChannelRecord × N   (pending → sending → delivered | failed)
//!   │     └── per-transport retry clock: 5 × 2^n minutes
//!   ├── DeliveryConfig      (re-enqueue clock: strategy-based, minutes)
//!   └── DeliveryStats       (attempts, opens, clicks, engagement score)
//! ```

pub mod channel;
pub mod delivery;
pub mod notification;
pub mod stats;

pub use channel::{ChannelPayload, ChannelRecord, DEFAULT_MAX_RETRIES};
pub use delivery::{
    BatchPolicy, CipherPolicy, ContentFilter, DeliveryConfig, Personalization, RateLimitPolicy,
    RateLimitSnapshot, RetryPolicy, SecurityPolicy, TemplatePolicy, TrackingPolicy,
};
pub use notification::{NewNotification, Notification, NotificationData};
pub use stats::{BasicMetrics, ChannelTally, DeliveryStats, Performance, StatsReport, UserBehavior};
