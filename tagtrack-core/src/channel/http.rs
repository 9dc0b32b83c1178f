//! HTTP delivery channel
//!
//! Initialization loads the tag container page for the configured
//! account/profile/environment; once it answers, commands are posted to the
//! container's dispatch endpoint one request per command.
//!
//! Posts go out one at a time from a single sender task, in hand-off order.
//! A command is only sent after the previous request has finished.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::{ChannelConfig, TrackerConfig};
use crate::error::{Error, Result};

use super::{DeliveryCallback, DeliveryChannel};

/// Channel posting commands to the tag container over HTTP
pub struct HttpChannel {
    http_client: reqwest::Client,
    container_url: String,
    dispatch_url: String,
    ready: AtomicBool,
    callback: Arc<RwLock<Option<DeliveryCallback>>>,
    /// Feeds the sender task; started on the first delivery
    outbox: Mutex<Option<UnboundedSender<String>>>,
}

impl HttpChannel {
    /// Create a channel for the tracker's identity
    ///
    /// Returns an error if the identity is incomplete.
    pub fn new(tracker: &TrackerConfig, config: &ChannelConfig) -> Result<Self> {
        let (account, profile, environment) = tracker.identity()?;

        let base = format!(
            "{}/{}/{}/{}",
            config.base_url.trim_end_matches('/'),
            urlencoding::encode(account),
            urlencoding::encode(profile),
            urlencoding::encode(environment)
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/javascript; charset=utf-8"),
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            container_url: format!("{}/mobile.html", base),
            dispatch_url: format!("{}/dispatch", base),
            ready: AtomicBool::new(false),
            callback: Arc::new(RwLock::new(None)),
            outbox: Mutex::new(None),
        })
    }

    /// URL loaded by the initialization round-trip
    pub fn container_url(&self) -> &str {
        &self.container_url
    }

    /// URL commands are posted to
    pub fn dispatch_url(&self) -> &str {
        &self.dispatch_url
    }

    fn start_sender(&self, runtime: &tokio::runtime::Handle) -> UnboundedSender<String> {
        let (outbox, pending) = mpsc::unbounded_channel();
        runtime.spawn(send_in_order(
            self.http_client.clone(),
            self.dispatch_url.clone(),
            self.callback.clone(),
            pending,
        ));
        outbox
    }
}

async fn send_in_order(
    http_client: reqwest::Client,
    dispatch_url: String,
    callback: Arc<RwLock<Option<DeliveryCallback>>>,
    mut pending: UnboundedReceiver<String>,
) {
    while let Some(command) = pending.recv().await {
        match http_client.post(&dispatch_url).body(command.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                let callback = callback.read().clone();
                if let Some(callback) = callback {
                    callback(&command);
                }
            }
            Ok(response) => {
                // At-most-once: the command is gone either way
                tracing::warn!(status = %response.status(), "Dispatch rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dispatch request failed");
            }
        }
    }
    tracing::debug!("Dispatch sender stopped");
}

#[async_trait]
impl DeliveryChannel for HttpChannel {
    async fn initialize(&self) -> Result<()> {
        let response = self
            .http_client
            .get(&self.container_url)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Channel(format!(
                "container load failed ({}): {}",
                status, self.container_url
            )));
        }

        self.ready.store(true, Ordering::SeqCst);
        tracing::debug!(url = %self.container_url, "Delivery channel initialized");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn deliver(&self, command: &str) {
        let mut outbox = self.outbox.lock();
        if outbox.as_ref().map_or(true, UnboundedSender::is_closed) {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => *outbox = Some(self.start_sender(&runtime)),
                Err(_) => {
                    tracing::warn!("No runtime to deliver on, dropping command");
                    return;
                }
            }
        }

        if let Some(sender) = outbox.as_ref() {
            if sender.send(command.to_string()).is_err() {
                tracing::warn!("Dispatch sender gone, dropping command");
            }
        }
    }

    fn set_callback(&self, callback: DeliveryCallback) {
        *self.callback.write() = Some(callback);
    }
}
