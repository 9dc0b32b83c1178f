//! Network reachability probes
//!
//! The dispatcher samples a [`ReachabilityProbe`] on a fixed period and reacts
//! to edges only: regaining connectivity starts a flush, losing it is logged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ReachabilityConfig;

/// Answers "can we reach the collection endpoint right now?"
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probe that opens a TCP connection to the endpoint host
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            address: format!("{}:{}", host, port),
            timeout,
        }
    }

    pub fn from_config(config: &ReachabilityConfig) -> Self {
        Self::new(
            &config.host,
            config.port,
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(&self.address))
            .await
        {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::trace!(address = %self.address, error = %e, "Probe connect failed");
                false
            }
            Err(_) => {
                tracing::trace!(address = %self.address, "Probe timed out");
                false
            }
        }
    }
}

/// Probe whose answer is set by hand
#[derive(Debug, Default)]
pub struct ManualReachability {
    reachable: AtomicBool,
}

impl ManualReachability {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: AtomicBool::new(reachable),
        }
    }

    pub fn set(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReachabilityProbe for ManualReachability {
    async fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}
