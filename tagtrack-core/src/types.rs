//! Core domain types for tagtrack
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Dispatch** | One outbound event, serialized as a channel command and queued for delivery |
//! | **Delivery channel** | Component that actually transmits a dispatch to the tag-management platform |
//! | **Flush cycle** | One self-rescheduling run draining the dispatch queue at a fixed rate |
//! | **Call type** | One of the lifecycle event kinds (launch, wake, sleep, terminate, crash) |
//! | **Suppression** | Dropping a lifecycle call that would duplicate or double-count a prior call |
//! | **Lifecycle record** | Durable per-install structure of lifecycle counters and timestamps |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat string-to-string event variables.
///
/// Ordered so serialized commands are stable.
pub type Variables = BTreeMap<String, String>;

// ============================================
// Well-known variable names
// ============================================

/// Variable carrying the clicked item name
pub const LINK_ID: &str = "link_id";

/// Variable carrying the viewed screen title
pub const SCREEN_TITLE: &str = "screen_title";

/// Event type for item clicks
pub const EVENT_LINK: &str = "link";

/// Event type for screen views
pub const EVENT_VIEW: &str = "view";

// ============================================
// Lifecycle call types
// ============================================

/// Application lifecycle call.
///
/// Mapping to the platform-neutral names used in enrichment data:
/// Create = launch, Resume = wake, Pause = sleep, Destroy = terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Create,
    Resume,
    Pause,
    Destroy,
    Crash,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Create => "create",
            CallType::Resume => "resume",
            CallType::Pause => "pause",
            CallType::Destroy => "destroy",
            CallType::Crash => "crash",
        }
    }

    /// Human-readable tag emitted in enrichment data
    pub fn lifecycle_name(&self) -> &'static str {
        match self {
            CallType::Create => "launch",
            CallType::Resume => "wake",
            CallType::Pause => "sleep",
            CallType::Destroy => "terminate",
            CallType::Crash => "crash",
        }
    }

    /// Whether this call closes an awake period
    pub fn ends_session(&self) -> bool {
        matches!(self, CallType::Pause | CallType::Destroy)
    }
}

impl std::fmt::Display for CallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" | "launch" => Ok(CallType::Create),
            "resume" | "wake" => Ok(CallType::Resume),
            "pause" | "sleep" => Ok(CallType::Pause),
            "destroy" | "terminate" => Ok(CallType::Destroy),
            "crash" => Ok(CallType::Crash),
            _ => Err(format!("unknown lifecycle call: {}", s)),
        }
    }
}
