//! Application lifecycle analytics
//!
//! Turns launch/wake/sleep/terminate/crash calls into enrichment data and
//! keeps a durable [`LifecycleRecord`] of counters and timestamps.
//!
//! ## Call handling
//!
//! ```text
//! call ──► suppressed? ──yes──► None (prior call type still advances)
//!              │ no
//!              ▼
//!        update counters ──► build enrichment map ──► session bookkeeping
//!              │
//!              ▼
//!        stamp last-similar dates ──► persist record ──► Some(map)
//! ```
//!
//! A call is suppressed when it repeats the prior call type, or when it is the
//! implicit wake that immediately follows a launch.
//!
//! ## Output keys
//!
//! Counters are emitted only once they exist in the record. Boolean flags are
//! emitted only when true.

mod calendar;
mod engine;
mod record;

pub use engine::LifecycleEngine;
pub use record::{CallStats, LifecycleRecord};

pub const KEY_LIFECYCLE_TYPE: &str = "lifecycle_type";
pub const KEY_HOUR_OF_DAY: &str = "lifecycle_hourofday_local";
pub const KEY_DAY_OF_WEEK: &str = "lifecycle_dayofweek_local";
pub const KEY_IS_FIRST_LAUNCH: &str = "lifecycle_isfirstlaunch";
pub const KEY_IS_FIRST_UPDATE_LAUNCH: &str = "lifecycle_isfirstlaunchupdate";
pub const KEY_IS_FIRST_WAKE_TODAY: &str = "lifecycle_isfirstwaketoday";
pub const KEY_IS_FIRST_WAKE_MONTH: &str = "lifecycle_isfirstwakemonth";
pub const KEY_LAST_SIMILAR_CALL_DATE: &str = "lifecycle_lastsimilarcalldate";
pub const KEY_FIRST_LAUNCH_DATE: &str = "lifecycle_firstlaunchdate";
pub const KEY_FIRST_LAUNCH_DATE_MMDDYYYY: &str = "lifecycle_firstlaunchdate_MMDDYYYY";
pub const KEY_UPDATE_LAUNCH_DATE: &str = "lifecycle_updatelaunchdate";
pub const KEY_SECONDS_AWAKE: &str = "lifecycle_secondsawake";
pub const KEY_PRIOR_SECONDS_AWAKE: &str = "lifecycle_priorsecondsawake";
pub const KEY_TOTAL_SECONDS_AWAKE: &str = "lifecycle_totalsecondsawake";
pub const KEY_DAYS_SINCE_WAKE: &str = "lifecycle_dayssincelastwake";
pub const KEY_DAYS_SINCE_LAUNCH: &str = "lifecycle_dayssincelaunch";
pub const KEY_DAYS_SINCE_UPDATE: &str = "lifecycle_dayssinceupdate";

pub const KEY_WAKE_COUNT: &str = "lifecycle_wakecount";
pub const KEY_LAUNCH_COUNT: &str = "lifecycle_launchcount";
pub const KEY_SLEEP_COUNT: &str = "lifecycle_sleepcount";
pub const KEY_TERMINATE_COUNT: &str = "lifecycle_terminatecount";
pub const KEY_CRASH_COUNT: &str = "exception_crashcount";
pub const KEY_TOTAL_WAKE_COUNT: &str = "lifecycle_totalwakecount";
pub const KEY_TOTAL_LAUNCH_COUNT: &str = "lifecycle_totallaunchcount";
pub const KEY_TOTAL_SLEEP_COUNT: &str = "lifecycle_totalsleepcount";
pub const KEY_TOTAL_TERMINATE_COUNT: &str = "lifecycle_totalterminatecount";
pub const KEY_TOTAL_CRASH_COUNT: &str = "exception_totalcrashcount";
