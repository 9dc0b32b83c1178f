//! # tagtrack-core
//!
//! Core library for tagtrack - an on-device event tracking client for a
//! tag-management platform.
//!
//! This library provides:
//! - A durable dispatch queue drained at a fixed rate to a delivery channel
//! - Reachability monitoring that restarts delivery when the network returns
//! - Application lifecycle analytics (launches, wakes, sleeps, session time)
//! - Configuration, logging, and a SQLite-backed key/value store
//!
//! ## Architecture
//!
//! ```text
//! track*() ──► Tracker ──► payload ──► CommandFormat ──► Dispatcher queue
//!                 │                                         │  every 200ms
//!                 ▼                                         ▼
//!          LifecycleEngine                           DeliveryChannel
//!                 │                                         ▲
//!                 ▼                                         │ regained
//!              KvStore ◄── queue snapshot on sleep   ReachabilityProbe (2s)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tagtrack_core::channel::HttpChannel;
//! use tagtrack_core::context::HostContext;
//! use tagtrack_core::reachability::TcpProbe;
//! use tagtrack_core::store::SqliteStore;
//! use tagtrack_core::{Config, Tracker};
//!
//! # async fn run() -> tagtrack_core::Result<()> {
//! let config = Config::load()?;
//! let store = Arc::new(SqliteStore::open(&config.resolved_store_path())?);
//! let channel = Arc::new(HttpChannel::new(&config.tracker, &config.channel)?);
//! let probe = Arc::new(TcpProbe::from_config(&config.reachability));
//! let context = Arc::new(HostContext::new(&config.app, store.as_ref()));
//!
//! let tracker = Tracker::new(&config, store, channel, probe, context)?;
//! tracker.wake();
//! tracker.application_create();
//! tracker.track_item_clicked("buy", None);
//! tracker.sleep();
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use dispatch::{DispatchStats, Dispatcher};
pub use error::{Error, Result};
pub use tracker::Tracker;
pub use types::*;

// Public modules
pub mod channel;
pub mod command;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod reachability;
pub mod schedule;
pub mod store;
pub mod tracker;
pub mod types;
