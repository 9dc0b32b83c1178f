//! Durable lifecycle record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CallType;

/// Recent timestamp and counters for one call type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallStats {
    /// When this call type was last accepted
    pub recent: Option<DateTime<Utc>>,
    pub recent_count: u32,
    pub total_count: u32,
}

impl CallStats {
    fn bump(&mut self) {
        self.recent_count = self.recent_count.saturating_add(1);
        self.total_count = self.total_count.saturating_add(1);
    }

    /// Whether this call type was ever counted
    pub fn is_counted(&self) -> bool {
        self.total_count > 0
    }
}

/// Counters and timestamps persisted across process restarts.
///
/// Serialized as JSON under the lifecycle log key. Missing fields decode to
/// their defaults so older logs keep loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleRecord {
    /// Set on the first accepted launch, never overwritten
    pub first_launch: Option<DateTime<Utc>>,
    pub first_launch_version: Option<String>,
    /// Version seen on the first launch after an update
    pub recent_version: Option<String>,
    /// When the update was first detected
    pub recent_update: Option<DateTime<Utc>>,

    pub wake: CallStats,
    pub launch: CallStats,
    pub sleep: CallStats,
    pub terminate: CallStats,
    pub crash: CallStats,

    /// Lifetime awake time in seconds
    pub seconds_awake_total: i64,
    /// Awake time since the last launch in seconds
    pub seconds_awake_since_launch: i64,

    pub prior_call: Option<CallType>,
}

impl LifecycleRecord {
    pub fn stats(&self, call: CallType) -> &CallStats {
        match call {
            CallType::Create => &self.launch,
            CallType::Resume => &self.wake,
            CallType::Pause => &self.sleep,
            CallType::Destroy => &self.terminate,
            CallType::Crash => &self.crash,
        }
    }

    fn stats_mut(&mut self, call: CallType) -> &mut CallStats {
        match call {
            CallType::Create => &mut self.launch,
            CallType::Resume => &mut self.wake,
            CallType::Pause => &mut self.sleep,
            CallType::Destroy => &mut self.terminate,
            CallType::Crash => &mut self.crash,
        }
    }

    /// Increment the counters touched by `call`. A launch also counts as a wake.
    pub(crate) fn count(&mut self, call: CallType) {
        self.stats_mut(call).bump();
        if call == CallType::Create {
            self.wake.bump();
        }
    }

    /// Stamp the last-similar date for `call`. A launch also stamps the wake date.
    pub(crate) fn stamp(&mut self, call: CallType, at: DateTime<Utc>) {
        self.stats_mut(call).recent = Some(at);
        if call == CallType::Create {
            self.wake.recent = Some(at);
        }
    }

    /// Record the installed version on a launch.
    ///
    /// The first version seen is kept forever; the first differing version
    /// afterwards marks an update at `at`.
    pub(crate) fn observe_version(&mut self, version: &str, at: DateTime<Utc>) {
        match self.first_launch_version.as_deref() {
            None => {
                self.first_launch_version = Some(version.to_string());
                self.recent_version = None;
                self.recent_update = None;
            }
            Some(first) if first != version && self.recent_version.is_none() => {
                self.recent_version = Some(version.to_string());
                self.recent_update = Some(at);
            }
            Some(_) => {}
        }
    }

    /// Whether a version different from the first launch was observed
    pub fn is_app_updated(&self) -> bool {
        match (&self.first_launch_version, &self.recent_version) {
            (Some(first), Some(recent)) => first != recent,
            _ => false,
        }
    }
}
