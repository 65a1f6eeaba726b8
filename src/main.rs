//! # Beacon CLI — operator console for the notification tracker.
//!
//! Usage:
//!   beacon create --user u1 --title "Deploy done" --content "Build 1842 is live" --email ops@example.com
//!   beacon list --user u1
//!   beacon read <id>
//!   beacon retry-due
//!   beacon report <id>

use anyhow::Result;
use beacon::{
    BeaconConfig, ChannelKind, NewNotification, Notification, NotificationDb, NotificationKind,
    Priority,
};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "beacon",
    version,
    about = "📡 Beacon — notification delivery tracker"
)]
struct Cli {
    /// Database path (defaults to the configured store path)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a notification and enable its delivery channels
    Create {
        /// Recipient user id
        #[arg(long)]
        user: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Notification type (system, reminder, invitation, …)
        #[arg(long, default_value = "system")]
        kind: String,
        /// Priority (low, normal, high, urgent)
        #[arg(long, default_value = "normal")]
        priority: String,
        /// Schedule the send this many minutes from now
        #[arg(long)]
        schedule_in: Option<i64>,
        /// Enable the email channel with this address
        #[arg(long)]
        email: Option<String>,
        /// Enable the SMS channel with this number
        #[arg(long)]
        sms: Option<String>,
        /// Enable the in-app channel
        #[arg(long)]
        in_app: bool,
    },
    /// Print one aggregate as JSON
    Show { id: String },
    /// List unread notifications for a user
    List {
        #[arg(long)]
        user: String,
    },
    /// Mark a notification as read
    Read { id: String },
    /// Record an open event
    Open { id: String },
    /// Record a click event
    Click { id: String },
    /// Cancel a notification (terminal)
    Cancel { id: String },
    /// List pending notifications whose send gate is open
    Due,
    /// List failed channels whose retry clock has elapsed
    RetryDue,
    /// Print the statistics report for one notification
    Report { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "beacon=debug,beacon_model=debug,beacon_store=debug"
    } else {
        "beacon=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = BeaconConfig::load()?;
    let db_path = cli.db.unwrap_or_else(|| config.store.resolved_path());
    let mut db = NotificationDb::open(&db_path)?;

    match cli.command {
        Command::Create {
            user,
            title,
            content,
            kind,
            priority,
            schedule_in,
            email,
            sms,
            in_app,
        } => {
            let notification = Notification::create(NewNotification {
                user_id: user,
                kind: NotificationKind::parse(&kind),
                title,
                content,
                priority: Priority::parse(&priority),
                scheduled_at: schedule_in.map(|mins| Utc::now() + Duration::minutes(mins)),
                ..NewNotification::default()
            });
            let mut notification = match notification {
                Ok(n) => n,
                Err(e) => {
                    eprintln!("❌ {e}");
                    std::process::exit(1);
                }
            };
            if let Some(address) = email {
                notification.enable_channel(ChannelKind::Email, Some(&address), None);
            }
            if let Some(number) = sms {
                notification.enable_channel(ChannelKind::Sms, Some(&number), None);
            }
            if in_app {
                notification.enable_channel(ChannelKind::InApp, None, None);
            }
            let mut invalid = false;
            for record in &notification.channels {
                for error in &record.validate().errors {
                    eprintln!("❌ {}: {error}", record.channel);
                    invalid = true;
                }
            }
            if invalid {
                std::process::exit(1);
            }
            db.save(&notification)?;
            println!("✅ Created {} ({})", notification.id, notification.kind);
        }
        Command::Show { id } => match db.load(&id)? {
            Some(notification) => println!("{}", serde_json::to_string_pretty(&notification)?),
            None => not_found(&id),
        },
        Command::List { user } => {
            let unread = db.unread_for_user(&user);
            if unread.is_empty() {
                println!("No unread notifications for {user}");
            }
            for n in unread {
                println!(
                    "{}  [{}/{}] {}  ({} channels)",
                    n.id,
                    n.kind,
                    n.priority,
                    n.title,
                    n.channels.len()
                );
            }
        }
        Command::Read { id } => with_aggregate(&mut db, &id, |n| {
            n.mark_as_read();
            println!("✅ {} marked read", n.id);
        })?,
        Command::Open { id } => with_aggregate(&mut db, &id, |n| {
            n.record_open();
            println!("👁 open recorded ({} total)", n.stats.open_count);
        })?,
        Command::Click { id } => with_aggregate(&mut db, &id, |n| {
            n.record_click();
            println!("🖱 click recorded ({} total)", n.stats.click_count);
        })?,
        Command::Cancel { id } => with_aggregate(&mut db, &id, |n| {
            n.cancel();
            println!("🚫 {} cancelled", n.id);
        })?,
        Command::Due => {
            let due = db.due_notifications(Utc::now());
            println!("{} notification(s) due for send", due.len());
            for n in due {
                println!("{}  [{}] {}", n.id, n.priority, n.title);
            }
        }
        Command::RetryDue => {
            let due = db.retry_due_channels(Utc::now());
            println!("{} channel(s) due for retry", due.len());
            for record in due {
                println!(
                    "{}  {}  retries={}  error={}",
                    record.notification_id,
                    record.channel,
                    record.retry_count,
                    record.error.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Report { id } => match db.load(&id)? {
            Some(notification) => {
                println!("{}", serde_json::to_string_pretty(&notification.stats.export_report())?)
            }
            None => not_found(&id),
        },
    }

    Ok(())
}

/// Load, mutate, save — one aggregate round trip.
fn with_aggregate<F>(db: &mut NotificationDb, id: &str, mutate: F) -> Result<()>
where
    F: FnOnce(&mut Notification),
{
    match db.load(id)? {
        Some(mut notification) => {
            mutate(&mut notification);
            db.save(&notification)?;
            Ok(())
        }
        None => {
            not_found(id);
            Ok(())
        }
    }
}

fn not_found(id: &str) {
    eprintln!("❌ No notification with id {id}");
    std::process::exit(1);
}
