//! Queue state machine, flush cycle, and reachability monitor

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::channel::DeliveryChannel;
use crate::config::DispatchConfig;
use crate::reachability::ReachabilityProbe;
use crate::schedule::{self, Tick};
use crate::store::{KvStore, QUEUE_SNAPSHOT_KEY};

use super::stats::{Counters, DispatchStats};

/// Durable FIFO of serialized commands drained to a [`DeliveryChannel`].
///
/// Starts asleep. While asleep every enqueue is rejected; while awake entries
/// are drained one per flush interval whenever the network is reachable and
/// the channel is ready. Cloning shares the same queue.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    /// Pending commands. Also serializes wake/sleep against enqueue and pop.
    queue: Mutex<VecDeque<String>>,
    awake: AtomicBool,
    reachable: AtomicBool,
    /// Single-flight guard for the flush cycle
    flushing: AtomicBool,
    /// Single-flight guard for channel initialization
    initializing: AtomicBool,
    /// Incremented on every wake; monitors from older wakes stop themselves
    wake_epoch: AtomicU64,
    config: DispatchConfig,
    store: Arc<dyn KvStore>,
    channel: Arc<dyn DeliveryChannel>,
    probe: Arc<dyn ReachabilityProbe>,
    runtime: Handle,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// Create an asleep dispatcher. Timers run on `runtime`.
    pub fn new(
        config: DispatchConfig,
        store: Arc<dyn KvStore>,
        channel: Arc<dyn DeliveryChannel>,
        probe: Arc<dyn ReachabilityProbe>,
        runtime: Handle,
    ) -> Self {
        let counters = Arc::new(Counters::default());

        let acked = counters.clone();
        channel.set_callback(Arc::new(move |command: &str| {
            Counters::bump(&acked.acknowledged);
            tracing::trace!(command, "Channel executed command");
        }));

        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                awake: AtomicBool::new(false),
                reachable: AtomicBool::new(false),
                flushing: AtomicBool::new(false),
                initializing: AtomicBool::new(false),
                wake_epoch: AtomicU64::new(0),
                config,
                store,
                channel,
                probe,
                runtime,
                counters,
            }),
        }
    }

    /// Load the persisted queue and start monitoring reachability.
    ///
    /// Returns false if already awake.
    pub fn wake(&self) -> bool {
        self.inner.wake()
    }

    /// Persist the queue and stop delivering.
    ///
    /// Returns false if already asleep.
    pub fn sleep(&self) -> bool {
        self.inner.sleep()
    }

    /// Append a command to the tail of the queue and try to start flushing.
    ///
    /// Returns false (and drops the command) while asleep.
    pub fn enqueue(&self, command: String) -> bool {
        self.inner.enqueue(command)
    }

    /// Start a flush cycle if none is running and delivery is possible.
    pub fn try_flush(&self) {
        self.inner.try_flush()
    }

    /// Run the channel's initialization round-trip in the background.
    ///
    /// A successful round-trip triggers a flush attempt.
    pub fn start_channel(&self) {
        self.inner.start_channel()
    }

    pub fn is_awake(&self) -> bool {
        self.inner.awake.load(Ordering::SeqCst)
    }

    pub fn is_reachable(&self) -> bool {
        self.inner.reachable.load(Ordering::SeqCst)
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.load(Ordering::SeqCst)
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Copy of the pending commands, head first
    pub fn queued(&self) -> Vec<String> {
        self.inner.queue.lock().iter().cloned().collect()
    }

    pub fn stats(&self) -> DispatchStats {
        self.inner.counters.snapshot()
    }
}

impl Inner {
    fn wake(self: &Arc<Self>) -> bool {
        let epoch = {
            let mut queue = self.queue.lock();
            if self.awake.load(Ordering::SeqCst) {
                return false;
            }
            *queue = self.load_snapshot();
            self.awake.store(true, Ordering::SeqCst);
            tracing::debug!(queued = queue.len(), "Woke up and loaded persisted queue");
            self.wake_epoch.fetch_add(1, Ordering::SeqCst) + 1
        };

        self.start_monitor(epoch);
        true
    }

    fn sleep(&self) -> bool {
        let mut queue = self.queue.lock();
        if !self.awake.swap(false, Ordering::SeqCst) {
            return false;
        }

        let snapshot = queue
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        if let Err(e) = self.store.set_string(QUEUE_SNAPSHOT_KEY, &snapshot) {
            tracing::error!(error = %e, lost = queue.len(), "Failed to persist dispatch queue");
        } else {
            tracing::debug!(persisted = queue.len(), "Going to sleep");
        }
        queue.clear();
        true
    }

    fn load_snapshot(&self) -> VecDeque<String> {
        match self.store.get_string(QUEUE_SNAPSHOT_KEY) {
            Ok(Some(snapshot)) => snapshot
                .trim()
                .split('\n')
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Ok(None) => VecDeque::new(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load dispatch queue, starting empty");
                VecDeque::new()
            }
        }
    }

    fn enqueue(self: &Arc<Self>, command: String) -> bool {
        {
            let mut queue = self.queue.lock();
            if !self.awake.load(Ordering::SeqCst) {
                Counters::bump(&self.counters.rejected);
                tracing::info!("Dispatch queue is asleep, dropping command");
                return false;
            }
            queue.push_back(command);
            Counters::bump(&self.counters.enqueued);
        }

        self.try_flush();
        true
    }

    fn deliverable(&self) -> bool {
        self.awake.load(Ordering::SeqCst)
            && self.reachable.load(Ordering::SeqCst)
            && self.channel.is_ready()
    }

    fn try_flush(self: &Arc<Self>) {
        if self.flushing.load(Ordering::SeqCst) {
            tracing::trace!("Flush cycle already running");
            return;
        }

        let queued = self.queue.lock().len();
        tracing::trace!(
            awake = self.awake.load(Ordering::SeqCst),
            reachable = self.reachable.load(Ordering::SeqCst),
            ready = self.channel.is_ready(),
            queued,
            "Flush attempt"
        );
        if queued == 0 || !self.deliverable() {
            return;
        }

        if self
            .flushing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let inner = self.clone();
        let interval = self.config.flush_interval();
        schedule::spawn_repeating(&self.runtime, interval, interval, move || {
            let inner = inner.clone();
            async move { inner.flush_tick() }
        });
    }

    /// Pop one entry and hand it over if delivery is still possible.
    fn flush_tick(&self) -> Tick {
        let command = {
            let mut queue = self.queue.lock();
            match queue.pop_front() {
                Some(command) => command,
                None => {
                    // Cleared under the lock so a concurrent enqueue either
                    // lands before this check or sees the flag down.
                    self.flushing.store(false, Ordering::SeqCst);
                    return Tick::Stop;
                }
            }
        };

        if self.deliverable() {
            tracing::debug!(command = %command, "Delivering command");
            self.channel.deliver(&command);
            Counters::bump(&self.counters.delivered);
        } else {
            tracing::debug!(command = %command, "Channel not deliverable, dropping popped command");
            Counters::bump(&self.counters.dropped);
        }

        Tick::Continue
    }

    fn start_monitor(self: &Arc<Self>, epoch: u64) {
        let inner = self.clone();
        schedule::spawn_repeating(
            &self.runtime,
            Duration::ZERO,
            self.config.reachability_interval(),
            move || {
                let inner = inner.clone();
                async move {
                    if !inner.monitor_current(epoch) {
                        tracing::trace!(epoch, "Reachability monitor stopping");
                        return Tick::Stop;
                    }
                    let reachable = inner.probe.is_reachable().await;
                    inner.observe_reachability(reachable);
                    Tick::Continue
                }
            },
        );
    }

    fn monitor_current(&self, epoch: u64) -> bool {
        self.awake.load(Ordering::SeqCst) && self.wake_epoch.load(Ordering::SeqCst) == epoch
    }

    fn observe_reachability(self: &Arc<Self>, reachable: bool) {
        let was_reachable = self.reachable.swap(reachable, Ordering::SeqCst);
        match (was_reachable, reachable) {
            (false, true) => {
                tracing::info!("Regained network connectivity, trying to flush the queue");
                if !self.channel.is_ready() {
                    self.start_channel();
                }
                self.try_flush();
            }
            (true, false) => {
                tracing::info!("Lost network connectivity");
            }
            _ => {}
        }
    }

    fn start_channel(self: &Arc<Self>) {
        if self.channel.is_ready() || self.initializing.swap(true, Ordering::SeqCst) {
            return;
        }

        let inner = self.clone();
        self.runtime.spawn(async move {
            let result = inner.channel.initialize().await;
            inner.initializing.store(false, Ordering::SeqCst);
            match result {
                Ok(()) if inner.channel.is_ready() => {
                    tracing::debug!("Delivery channel ready");
                    inner.try_flush();
                }
                Ok(()) => {
                    tracing::debug!("Delivery channel initialized but not ready");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Delivery channel failed to initialize");
                }
            }
        });
    }
}
