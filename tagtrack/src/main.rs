//! tagtrack - command-line event tracking client
//!
//! Each tracking command runs one short session: wake (which loads the
//! persisted queue and fires the automatic screen view), track, drain the
//! queue, then sleep so anything undelivered is persisted for the next run.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Store: $XDG_DATA_HOME/tagtrack/store.db (~/.local/share/tagtrack/store.db)
//! - Logs: $XDG_STATE_HOME/tagtrack/tagtrack.log.<date> (~/.local/state/tagtrack/), with --verbose
//! - Config: $XDG_CONFIG_HOME/tagtrack/config.toml (~/.config/tagtrack/config.toml)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tagtrack_core::channel::{DeliveryChannel, HttpChannel, RecordingChannel};
use tagtrack_core::context::HostContext;
use tagtrack_core::lifecycle::LifecycleEngine;
use tagtrack_core::reachability::{ManualReachability, ReachabilityProbe, TcpProbe};
use tagtrack_core::store::{KvStore, SqliteStore, QUEUE_SNAPSHOT_KEY};
use tagtrack_core::{CallType, Config, Tracker, Variables};

#[derive(Parser)]
#[command(name = "tagtrack")]
#[command(about = "Track events and application lifecycle through a durable dispatch queue")]
#[command(version)]
struct Args {
    /// Config file (defaults to $XDG_CONFIG_HOME/tagtrack/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write logs to the state directory
    #[arg(short, long)]
    verbose: bool,

    /// Keep everything local: record instead of sending, never reachable
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show configuration, pending queue, and lifecycle counters
    Status,
    /// Track a custom event
    Track {
        /// Event type
        event: String,
        /// Event variable as key=value (repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
    /// Track an item click
    Click {
        name: String,
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
    /// Track a screen view
    Screen {
        title: String,
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
    /// Record a lifecycle call (create, resume, pause, destroy, crash)
    Lifecycle { call: CallType },
    /// Deliver whatever is queued from earlier runs
    Flush,
    /// Zero every lifecycle counter and timestamp
    ResetLifecycle,
}

fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got {:?}", s)),
    }
}

fn to_variables(vars: Vec<(String, String)>) -> Variables {
    vars.into_iter().collect()
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };

    let _log_guard = if args.verbose {
        Some(tagtrack_core::logging::init(&config.logging).context("failed to initialize logging")?)
    } else {
        None
    };

    tracing::info!(offline = args.offline, "tagtrack starting");

    let store_path = config.resolved_store_path();
    let store: Arc<SqliteStore> = Arc::new(
        SqliteStore::open(&store_path)
            .with_context(|| format!("failed to open store at {}", store_path.display()))?,
    );

    match args.command {
        Command::Status => cmd_status(&config, store),
        Command::ResetLifecycle => {
            LifecycleEngine::load(store, config.app.version.clone()).reset();
            println!("Lifecycle log reset");
            Ok(())
        }
        command => run_session(&config, store, args.offline, command),
    }
}

fn cmd_status(config: &Config, store: Arc<SqliteStore>) -> Result<()> {
    let tracker = &config.tracker;

    println!("tagtrack Configuration");
    println!("======================");
    println!();
    println!(
        "Account:         {}",
        tracker.account.as_deref().unwrap_or("<not set>")
    );
    println!(
        "Profile:         {}",
        tracker.profile.as_deref().unwrap_or("<not set>")
    );
    println!(
        "Environment:     {}",
        tracker.environment.as_deref().unwrap_or("<not set>")
    );
    match tracker.validate() {
        Ok(()) => println!("Identity:        valid"),
        Err(e) => println!("Identity:        invalid ({})", e),
    }
    println!("Store:           {}", config.resolved_store_path().display());
    println!("Logs:            {}", Config::log_dir().display());
    println!("Flush Interval:  {}ms", config.dispatch.flush_interval_ms);
    println!(
        "Reachability:    {}:{} every {}ms",
        config.reachability.host, config.reachability.port, config.dispatch.reachability_interval_ms
    );

    let pending = store
        .get_string(QUEUE_SNAPSHOT_KEY)
        .context("failed to read queue snapshot")?
        .map(|snapshot| snapshot.lines().filter(|l| !l.is_empty()).count())
        .unwrap_or(0);
    println!();
    println!("Pending:         {}", pending);

    let record = LifecycleEngine::load(store, config.app.version.clone()).record();
    println!();
    println!("Lifecycle");
    println!("---------");
    println!(
        "First Launch:    {}",
        record
            .first_launch
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    println!("Launches:        {}", record.launch.total_count);
    println!("Wakes:           {}", record.wake.total_count);
    println!("Sleeps:          {}", record.sleep.total_count);
    println!("Terminations:    {}", record.terminate.total_count);
    println!("Crashes:         {}", record.crash.total_count);
    println!("Seconds Awake:   {}", record.seconds_awake_total);
    println!(
        "Last Call:       {}",
        record
            .prior_call
            .map(|c| c.lifecycle_name().to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn run_session(
    config: &Config,
    store: Arc<SqliteStore>,
    offline: bool,
    command: Command,
) -> Result<()> {
    config
        .tracker
        .validate()
        .context("tracker identity is incomplete (see `tagtrack status`)")?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async move {
        let (channel, probe): (Arc<dyn DeliveryChannel>, Arc<dyn ReachabilityProbe>) = if offline {
            (
                Arc::new(RecordingChannel::new()),
                Arc::new(ManualReachability::new(false)),
            )
        } else {
            (
                Arc::new(
                    HttpChannel::new(&config.tracker, &config.channel)
                        .context("failed to create delivery channel")?,
                ),
                Arc::new(TcpProbe::from_config(&config.reachability)),
            )
        };
        let context = Arc::new(HostContext::new(&config.app, store.as_ref()));
        let tracker = Tracker::new(config, store, channel, probe, context)
            .context("failed to create tracker")?;

        tracker.wake();
        match command {
            Command::Track { event, vars } => {
                tracker.track_custom_event(&event, to_variables(vars));
            }
            Command::Click { name, vars } => {
                tracker.track_item_clicked(&name, Some(to_variables(vars)));
            }
            Command::Screen { title, vars } => {
                tracker.track_screen_viewed(&title, Some(to_variables(vars)));
            }
            Command::Lifecycle { call } => match tracker.lifecycle_call(call) {
                Some(data) => println!("{}", serde_json::to_string_pretty(&data)?),
                None => println!("Suppressed {} call (repeat of the previous call)", call),
            },
            Command::Flush => {}
            Command::Status | Command::ResetLifecycle => {
                return Err(anyhow!("not a tracking command"));
            }
        }

        if !offline {
            drain(&tracker, config).await;
        }

        let pending = tracker.dispatcher().queue_len();
        tracker.sleep();

        let stats = tracker.dispatch_stats();
        println!("Queued:          {}", stats.enqueued);
        println!("Delivered:       {}", stats.delivered);
        println!("Acknowledged:    {}", stats.acknowledged);
        println!("Dropped:         {}", stats.dropped);
        println!("Persisted:       {}", pending);

        tracing::info!(
            enqueued = stats.enqueued,
            delivered = stats.delivered,
            persisted = pending,
            "Session complete"
        );
        Ok::<(), anyhow::Error>(())
    })
}

/// Wait for the queue to empty and in-flight deliveries to finish, bounded by
/// the channel timeout plus one flush interval per queued entry.
async fn drain(tracker: &Tracker, config: &Config) {
    let interval = config.dispatch.flush_interval();
    let queued = tracker.dispatcher().queue_len() as u32;
    let budget = Duration::from_secs(config.channel.timeout_secs)
        + config.dispatch.reachability_interval()
        + interval * (queued + 1);
    let deadline = tokio::time::Instant::now() + budget;

    while tokio::time::Instant::now() < deadline {
        let dispatcher = tracker.dispatcher();
        let stats = dispatcher.stats();
        if dispatcher.queue_len() == 0
            && !dispatcher.is_flushing()
            && stats.acknowledged >= stats.delivered
        {
            return;
        }
        tokio::time::sleep(interval).await;
    }

    tracing::warn!(
        remaining = tracker.dispatcher().queue_len(),
        "Drain deadline reached"
    );
}
