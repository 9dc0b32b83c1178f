//! Dispatch queue and delivery engine
//!
//! ## Architecture
//!
//! ```text
//! Tracker ──enqueue──▶ [ FIFO queue ] ──pop every 200ms──▶ DeliveryChannel
//!                           ▲    │
//!              wake: load   │    │ sleep: persist + clear
//!                           │    ▼
//!                      KvStore (snapshot)
//!
//! ReachabilityProbe ◀──poll every 2000ms── monitor ──false→true──▶ flush attempt
//! ```
//!
//! The queue is write-back: the durable snapshot is written on sleep and read
//! on wake, never in between. Once popped, an entry is handed to the channel
//! or dropped; there is no retry.

mod dispatcher;
mod stats;

pub use dispatcher::Dispatcher;
pub use stats::DispatchStats;
