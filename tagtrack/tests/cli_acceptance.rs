use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(xdg_config.join("tagtrack")).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    /// Environment with a complete account identity
    fn configured() -> Self {
        let env = Self::new();
        fs::write(
            env.xdg_config.join("tagtrack/config.toml"),
            r#"
[tracker]
account = "acme"
profile = "mobile"
environment = "dev"
screen_title = "Home"

[app]
name = "Shop"
version = "1.0"
"#,
        )
        .expect("failed to write config");
        env
    }

    fn store_path(&self) -> PathBuf {
        self.xdg_data.join("tagtrack/store.db")
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("tagtrack"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute tagtrack: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "tagtrack {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn stdout_of(env: &CliTestEnv, args: &[&str]) -> String {
    let output = run_bin(env, args);
    assert_success(args, &output);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn status_reports_missing_identity() {
    let env = CliTestEnv::new();

    let stdout = stdout_of(&env, &["status"]);
    assert!(stdout.contains("tagtrack Configuration"));
    assert!(stdout.contains("Account:         <not set>"));
    assert!(stdout.contains("Identity:        invalid"));
    assert!(stdout.contains(&format!("Logs:            {}", env.xdg_state.join("tagtrack").display())));
    assert!(stdout.contains("Pending:         0"));
}

#[test]
fn tracking_without_identity_fails() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["--offline", "click", "buy"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("tracker identity is incomplete"),
        "unexpected stderr:\n{stderr}"
    );
}

#[test]
fn offline_events_persist_across_runs() {
    let env = CliTestEnv::configured();

    let first = stdout_of(&env, &["--offline", "click", "buy", "--var", "sku=42"]);
    assert!(first.contains("Queued:          2"), "stdout:\n{first}");
    assert!(first.contains("Delivered:       0"));
    assert!(first.contains("Persisted:       2"));
    assert!(env.store_path().exists());

    // Second run reloads both entries and adds its own screen view
    let second = stdout_of(&env, &["--offline", "screen", "Cart"]);
    assert!(second.contains("Persisted:       4"), "stdout:\n{second}");

    let status = stdout_of(&env, &["status"]);
    assert!(status.contains("Identity:        valid"));
    assert!(status.contains("Pending:         4"));
}

#[test]
fn lifecycle_commands_update_counters() {
    let env = CliTestEnv::configured();

    let launch = stdout_of(&env, &["--offline", "lifecycle", "create"]);
    assert!(launch.contains(r#""lifecycle_type": "launch""#), "stdout:\n{launch}");
    assert!(launch.contains(r#""lifecycle_isfirstlaunch": "true""#));

    let repeat = stdout_of(&env, &["--offline", "lifecycle", "launch"]);
    assert!(repeat.contains("Suppressed create call"));

    stdout_of(&env, &["--offline", "lifecycle", "pause"]);

    let status = stdout_of(&env, &["status"]);
    assert!(status.contains("Launches:        1"));
    assert!(status.contains("Sleeps:          1"));
    assert!(status.contains("Last Call:       sleep"));

    let reset = stdout_of(&env, &["reset-lifecycle"]);
    assert!(reset.contains("Lifecycle log reset"));

    let status = stdout_of(&env, &["status"]);
    assert!(status.contains("Launches:        0"));
    assert!(status.contains("First Launch:    never"));
}

#[test]
fn rejects_malformed_variables() {
    let env = CliTestEnv::configured();

    let output = run_bin(&env, &["--offline", "track", "purchase", "--var", "novalue"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected key=value"), "stderr:\n{stderr}");
}

#[test]
fn verbose_writes_dated_log_file() {
    let env = CliTestEnv::configured();

    stdout_of(&env, &["--verbose", "--offline", "click", "buy"]);

    let log_dir = env.xdg_state.join("tagtrack");
    let logs: Vec<_> = fs::read_dir(&log_dir)
        .expect("log directory created")
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with("tagtrack.log."))
                .unwrap_or(false)
        })
        .collect();
    assert_eq!(logs.len(), 1, "log files: {logs:?}");

    let contents = fs::read_to_string(&logs[0]).expect("read log file");
    assert!(contents.contains("Tracker logging enabled"), "log:\n{contents}");
}
