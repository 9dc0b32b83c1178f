//! Public tracking facade
//!
//! [`Tracker`] owns the dispatch queue and the lifecycle engine. Every `track*`
//! call builds one enriched payload, renders it as a channel command, and
//! enqueues it. Lifecycle calls go through the engine first and are tracked as
//! `lifecycle` item clicks when not suppressed.
//!
//! Payload merge order, later sources overriding earlier ones by key:
//!
//! 1. dynamic context facts
//! 2. static context facts
//! 3. base variables
//! 4. persistent variables (`[tracker] variables`, `set_variables`)
//! 5. call variables

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::runtime::Handle;

use crate::channel::DeliveryChannel;
use crate::command::CommandFormat;
use crate::config::Config;
use crate::context::ContextProvider;
use crate::dispatch::{DispatchStats, Dispatcher};
use crate::error::{Error, Result};
use crate::lifecycle::{LifecycleEngine, LifecycleRecord};
use crate::reachability::ReachabilityProbe;
use crate::store::KvStore;
use crate::types::{CallType, Variables, EVENT_LINK, EVENT_VIEW, LINK_ID, SCREEN_TITLE};

/// Name of the item click carrying lifecycle data
pub const LIFECYCLE_EVENT: &str = "lifecycle";

pub struct Tracker {
    screen_title: String,
    format: CommandFormat,
    dispatcher: Dispatcher,
    lifecycle: LifecycleEngine,
    context: Arc<dyn ContextProvider>,
    base_variables: Variables,
    persistent_variables: RwLock<Variables>,
}

impl Tracker {
    /// Build an asleep tracker.
    ///
    /// Fails when the account identity is incomplete or when called outside a
    /// tokio runtime. Channel initialization starts right away.
    pub fn new(
        config: &Config,
        store: Arc<dyn KvStore>,
        channel: Arc<dyn DeliveryChannel>,
        probe: Arc<dyn ReachabilityProbe>,
        context: Arc<dyn ContextProvider>,
    ) -> Result<Self> {
        let (account, profile, environment) = config.tracker.identity()?;
        let runtime = Handle::try_current()
            .map_err(|e| Error::Runtime(format!("tracker needs a tokio runtime: {}", e)))?;

        let dispatcher = Dispatcher::new(
            config.dispatch.clone(),
            store.clone(),
            channel,
            probe,
            runtime,
        );
        let lifecycle = LifecycleEngine::load(store, config.app.version.clone());

        let mut base_variables = Variables::new();
        base_variables.insert("platform".to_string(), std::env::consts::OS.to_string());

        tracing::info!(account, profile, environment, "Tracker created");

        let tracker = Self {
            screen_title: config.tracker.screen_title.clone(),
            format: CommandFormat::from_config(&config.channel),
            dispatcher,
            lifecycle,
            context,
            base_variables,
            persistent_variables: RwLock::new(config.tracker.variables.clone()),
        };
        tracker.dispatcher.start_channel();
        Ok(tracker)
    }

    /// Wake up and fire a screen view for the configured screen title.
    pub fn wake(&self) -> bool {
        let title = self.screen_title.clone();
        self.wake_with_title(&title)
    }

    /// Wake up and fire a screen view for `title`.
    ///
    /// Returns false if already awake.
    pub fn wake_with_title(&self, title: &str) -> bool {
        if !self.dispatcher.wake() {
            return false;
        }
        tracing::debug!(title, "Firing automatic screen view");
        self.track_screen_viewed(title, None);
        true
    }

    /// Persist the queue and stop delivering. Returns false if already asleep.
    pub fn sleep(&self) -> bool {
        self.dispatcher.sleep()
    }

    pub fn is_awake(&self) -> bool {
        self.dispatcher.is_awake()
    }

    /// Track an event of any type.
    pub fn track_custom_event(&self, event_type: &str, variables: Variables) {
        if !self.dispatcher.is_awake() {
            tracing::info!(
                event_type,
                "Track called while asleep, dropping event (wake the tracker first)"
            );
            return;
        }

        let payload = self.payload(variables);
        match self.format.render(event_type, &payload) {
            Ok(command) => {
                self.dispatcher.enqueue(command);
            }
            Err(e) => tracing::error!(event_type, error = %e, "Unable to render command"),
        }
    }

    /// Track a click on the item `name`.
    pub fn track_item_clicked(&self, name: &str, variables: Option<Variables>) {
        let mut variables = variables.unwrap_or_default();
        variables.insert(LINK_ID.to_string(), name.to_string());
        self.track_custom_event(EVENT_LINK, variables);
    }

    /// Track a view of the screen `title`.
    pub fn track_screen_viewed(&self, title: &str, variables: Option<Variables>) {
        let mut variables = variables.unwrap_or_default();
        variables.insert(SCREEN_TITLE.to_string(), title.to_string());
        self.track_custom_event(EVENT_VIEW, variables);
    }

    pub fn application_create(&self) -> Option<Variables> {
        self.lifecycle_call(CallType::Create)
    }

    pub fn application_resume(&self) -> Option<Variables> {
        self.lifecycle_call(CallType::Resume)
    }

    pub fn application_pause(&self) -> Option<Variables> {
        self.lifecycle_call(CallType::Pause)
    }

    pub fn application_destroy(&self) -> Option<Variables> {
        self.lifecycle_call(CallType::Destroy)
    }

    pub fn application_crash(&self) -> Option<Variables> {
        self.lifecycle_call(CallType::Crash)
    }

    /// Run a lifecycle call and track its data unless suppressed.
    pub fn lifecycle_call(&self, call: CallType) -> Option<Variables> {
        let data = self.lifecycle.lifecycle_data(call)?;
        self.track_item_clicked(LIFECYCLE_EVENT, Some(data.clone()));
        Some(data)
    }

    /// Zero all lifecycle counters and timestamps.
    pub fn reset_lifecycle_log(&self) {
        self.lifecycle.reset();
    }

    pub fn lifecycle_record(&self) -> LifecycleRecord {
        self.lifecycle.record()
    }

    /// Replace the persistent variables. `None` clears them.
    pub fn set_variables(&self, variables: Option<Variables>) {
        *self.persistent_variables.write() = variables.unwrap_or_default();
    }

    /// Set one persistent variable. `None` removes it.
    pub fn set_variable(&self, name: &str, value: Option<&str>) {
        let mut variables = self.persistent_variables.write();
        match value {
            Some(value) => {
                variables.insert(name.to_string(), value.to_string());
            }
            None => {
                variables.remove(name);
            }
        }
    }

    pub fn variables(&self) -> Variables {
        self.persistent_variables.read().clone()
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn payload(&self, variables: Variables) -> Variables {
        let mut payload = self.context.dynamic_facts();
        payload.extend(self.context.static_facts());
        payload.extend(self.base_variables.clone());
        payload.extend(self.persistent_variables.read().clone());
        payload.extend(variables);
        payload
    }
}
