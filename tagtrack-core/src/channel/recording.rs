//! In-memory delivery channel

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::Result;

use super::{DeliveryCallback, DeliveryChannel};

/// One command handed to a [`RecordingChannel`]
#[derive(Debug, Clone)]
pub struct Delivery {
    pub command: String,
    pub at: Instant,
}

/// Channel that records every command instead of sending it.
///
/// Used for offline runs and tests. Every delivery counts as executed, so the
/// callback fires synchronously.
pub struct RecordingChannel {
    ready: AtomicBool,
    ready_on_initialize: bool,
    deliveries: Mutex<Vec<Delivery>>,
    callback: Mutex<Option<DeliveryCallback>>,
}

impl RecordingChannel {
    /// Channel that becomes ready once initialized
    pub fn new() -> Self {
        Self::with_readiness(false, true)
    }

    /// Channel that stays unready until [`RecordingChannel::set_ready`]
    pub fn unready() -> Self {
        Self::with_readiness(false, false)
    }

    fn with_readiness(ready: bool, ready_on_initialize: bool) -> Self {
        Self {
            ready: AtomicBool::new(ready),
            ready_on_initialize,
            deliveries: Mutex::new(Vec::new()),
            callback: Mutex::new(None),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Everything delivered so far, in order
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    /// Delivered command texts, in order
    pub fn commands(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .iter()
            .map(|d| d.command.clone())
            .collect()
    }
}

impl Default for RecordingChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn initialize(&self) -> Result<()> {
        if self.ready_on_initialize {
            self.ready.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn deliver(&self, command: &str) {
        self.deliveries.lock().push(Delivery {
            command: command.to_string(),
            at: Instant::now(),
        });
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback(command);
        }
    }

    fn set_callback(&self, callback: DeliveryCallback) {
        *self.callback.lock() = Some(callback);
    }
}
