//! Delivery channels
//!
//! The dispatch queue never talks to the network itself. Every command it pops
//! is handed to a [`DeliveryChannel`], a narrow contract over whatever actually
//! transmits the event:
//!
//! - a one-time initialization round-trip that flips [`DeliveryChannel::is_ready`]
//! - `deliver`, accepting one serialized command at a time
//! - a callback the channel invokes after it executed a command
//!
//! The callback is diagnostic only; delivery is at-most-once and never retried.

mod http;
mod recording;

pub use http::HttpChannel;
pub use recording::{Delivery, RecordingChannel};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Invoked with the command text after the channel executed it
pub type DeliveryCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Transport for serialized commands.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// One-time initialization round-trip. Readiness flips on success.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Whether the channel accepts commands
    fn is_ready(&self) -> bool;

    /// Hand one command to the channel. Fire and forget.
    fn deliver(&self, command: &str);

    /// Register the post-delivery callback
    fn set_callback(&self, callback: DeliveryCallback);
}
