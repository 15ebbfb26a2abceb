//! # Server Watcher Library
//!
//! This library implements a status watcher for a single game server. It
//! periodically pings the server over its status protocol, keeps a rolling
//! history of what it saw, and announces player joins and leaves in a chat.
//!
//! ## Core Responsibilities
//!
//! ### Status Acquisition
//! Each check opens a TCP connection, sends the handshake and status request,
//! and reads back a length-prefixed JSON document. Failed probes are retried
//! a fixed number of times with a fixed delay before the server is declared
//! unreachable for that cycle.
//!
//! ### Reconciliation
//! A sample may carry only a player count, or a partial list of names. The
//! reconciliation step (see [`shared::reconcile()`]) merges it with the last
//! stored roster and decides whether the result is reliable enough to report
//! individual joins and leaves.
//!
//! ### Persistence and Notification
//! Every cycle appends exactly one observation to the retention store and
//! updates the chat title. A change message is only sent for reliable rosters
//! with at least one join or leave.
//!
//! ## Module Organization
//!
//! ### Configuration (`config`)
//! Command-line flags with environment fallbacks, validated at startup.
//!
//! ### Probe (`probe`)
//! The TCP status client and the [`probe::Prober`] seam used by cycles.
//!
//! ### Retention Store (`store`)
//! File-backed observation log with latest lookup and age-based pruning.
//!
//! ### Notifier (`notifier`)
//! Telegram Bot API client and message formatting.
//!
//! ### Cycles (`cycle`)
//! [`cycle::Monitor`], the context object driving check and prune cycles.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use watcher::cycle::{CycleSettings, Monitor};
//! use watcher::notifier::TelegramNotifier;
//! use watcher::probe::TcpProber;
//! use watcher::store::RetentionStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(RetentionStore::open("status.json").await);
//!     let prober = TcpProber::new("mc.example.org", 25565, Duration::from_secs(3));
//!     let notifier = TelegramNotifier::new("https://api.telegram.org", "TOKEN", "-100123")?;
//!
//!     let settings = CycleSettings {
//!         title: "minecraft server".to_string(),
//!         max_retries: 3,
//!         retry_delay: Duration::from_secs(3),
//!         retention: Duration::from_secs(24 * 60 * 60),
//!     };
//!     let monitor = Monitor::new(settings, store, prober, notifier);
//!
//!     let report = monitor.run_check().await;
//!     println!("online: {}", report.observation.online);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cycle;
pub mod notifier;
pub mod probe;
pub mod store;
pub mod utils;
