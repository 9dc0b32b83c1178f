//! Device and application context attached to every event
//!
//! Static facts are computed once per process. Dynamic facts are read again
//! for every event.

use chrono::Utc;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::store::{KvStore, INSTALL_UUID_KEY};
use crate::types::Variables;

/// Source of context variables merged into every event
pub trait ContextProvider: Send + Sync {
    /// Facts stable for the process lifetime
    fn static_facts(&self) -> Variables;

    /// Facts read on every event
    fn dynamic_facts(&self) -> Variables;
}

/// Context derived from the host and the `[app]` config section
pub struct HostContext {
    app: AppConfig,
    static_facts: Variables,
}

impl HostContext {
    pub fn new(app: &AppConfig, store: &dyn KvStore) -> Self {
        let uuid = install_uuid(store);
        let static_facts = static_facts(app, &uuid);
        Self {
            app: app.clone(),
            static_facts,
        }
    }
}

impl ContextProvider for HostContext {
    fn static_facts(&self) -> Variables {
        self.static_facts.clone()
    }

    fn dynamic_facts(&self) -> Variables {
        let now = Utc::now();
        let mut facts = Variables::new();
        if let Some(carrier) = &self.app.carrier {
            facts.insert("carrier".to_string(), carrier.clone());
        }
        facts.insert(
            "connection_type".to_string(),
            self.app
                .connection_type
                .clone()
                .unwrap_or_else(|| "UNKNOWN".to_string()),
        );
        if let Some(orientation) = &self.app.orientation {
            facts.insert("orientation".to_string(), orientation.clone());
        }
        facts.insert("platform".to_string(), platform().to_string());
        facts.insert(
            "timestamp".to_string(),
            now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        facts.insert("timestamp_unix".to_string(), now.timestamp().to_string());
        facts
    }
}

/// Fixed context for tests and tools
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    pub static_facts: Variables,
    pub dynamic_facts: Variables,
}

impl ContextProvider for StaticContext {
    fn static_facts(&self) -> Variables {
        self.static_facts.clone()
    }

    fn dynamic_facts(&self) -> Variables {
        self.dynamic_facts.clone()
    }
}

fn platform() -> &'static str {
    std::env::consts::OS
}

fn static_facts(app: &AppConfig, uuid: &str) -> Variables {
    let mut facts = Variables::new();

    let name = app.name.clone().unwrap_or_else(|| "unknown".to_string());
    let version = app.version.clone().unwrap_or_else(|| "0".to_string());
    facts.insert("app_id".to_string(), format!("{} {}", name, version));
    facts.insert("app_name".to_string(), name);
    facts.insert("app_version".to_string(), version);

    facts.insert(
        "device".to_string(),
        app.device.clone().unwrap_or_else(|| {
            format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
        }),
    );
    if let Some(resolution) = &app.resolution {
        facts.insert("device_resolution".to_string(), resolution.clone());
    }
    if let Some(os_version) = &app.os_version {
        facts.insert("os_version".to_string(), os_version.clone());
    }
    facts.insert("platform".to_string(), platform().to_string());
    facts.insert("uuid".to_string(), uuid.to_string());
    facts.insert(
        "library_version".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    facts
}

/// Read the install UUID, generating and persisting one on first use.
///
/// A store failure yields a fresh UUID for this process only.
pub fn install_uuid(store: &dyn KvStore) -> String {
    match store.get_string(INSTALL_UUID_KEY) {
        Ok(Some(existing)) if !existing.trim().is_empty() => return existing.trim().to_string(),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Unable to read install UUID"),
    }

    let uuid = Uuid::new_v4().to_string();
    if let Err(e) = store.set_string(INSTALL_UUID_KEY, &uuid) {
        tracing::warn!(error = %e, "Unable to persist install UUID");
    } else {
        tracing::debug!(uuid = %uuid, "Generated install UUID");
    }
    uuid
}
