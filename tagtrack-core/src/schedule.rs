//! Repeating timer tasks
//!
//! The flush cycle and the reachability poll are both "run, then run again
//! after a delay" loops. Instead of callbacks re-posting themselves, each loop
//! is a task that sleeps between ticks and asks its tick whether to go on.
//! Nothing is cancelled from outside: a tick re-checks the flags it depends on
//! and returns [`Tick::Stop`] when the loop should end.

use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Schedule another tick after the period
    Continue,
    /// End the loop
    Stop,
}

/// Spawn a repeating task on `runtime`.
///
/// The first tick fires after `initial_delay`, every following tick `period`
/// after the previous one finished.
pub fn spawn_repeating<F, Fut>(
    runtime: &Handle,
    initial_delay: Duration,
    period: Duration,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Tick> + Send + 'static,
{
    runtime.spawn(async move {
        let mut delay = initial_delay;
        loop {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if tick().await == Tick::Stop {
                break;
            }
            delay = period;
        }
    })
}
