#![cfg(all(unix, feature = "cli"))]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/tpcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn tickpipe() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_tickpipe"));
    command.env_remove("TICKPIPE_LOG_FILE");
    command
}

fn spawn_listener(endpoint: &str, extra: &[&str]) -> Child {
    tickpipe()
        .args(["--log-level", "error", "--format", "json", "listen", endpoint])
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen command should start")
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        assert!(
            start.elapsed() < timeout,
            "socket {} never appeared",
            path.display()
        );
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        match child.try_wait().expect("child status should be readable") {
            Some(_) => return child.wait_with_output().expect("child output should be readable"),
            None if start.elapsed() >= timeout => {
                let _ = child.kill();
                let mut stderr = String::new();
                if let Some(mut pipe) = child.stderr.take() {
                    let _ = pipe.read_to_string(&mut stderr);
                }
                panic!("child did not exit within {timeout:?}; stderr: {stderr}");
            }
            None => thread::sleep(Duration::from_millis(25)),
        }
    }
}

fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

#[test]
fn send_reaches_listener_as_one_line() {
    let dir = unique_temp_dir("send");
    let sock_path = dir.join("game.sock");
    let endpoint = format!("unix:{}", sock_path.display());

    let listener = spawn_listener(&endpoint, &["--count", "2"]);
    wait_for_socket(&sock_path, Duration::from_secs(3));

    let first = tickpipe()
        .args(["--log-level", "error", "--format", "json", "send", &endpoint])
        .args(["--json", "{ \"a\": 1 }"])
        .output()
        .expect("send should run");
    assert!(first.status.success(), "send failed: {first:?}");
    let sent = json_lines(&first);
    assert_eq!(sent[0]["payload"], r#"{"a":1}"#);
    assert_eq!(sent[0]["bytes"], 8);

    let second = tickpipe()
        .args(["--log-level", "error", "send", &endpoint, "--data", "ping"])
        .output()
        .expect("send should run");
    assert!(second.status.success(), "send failed: {second:?}");

    let output = wait_with_timeout(listener, Duration::from_secs(5));
    assert!(output.status.success());
    let received = json_lines(&output);
    assert_eq!(received.len(), 2);
    assert_eq!(received[0]["payload"]["a"], 1);
    assert_eq!(received[0]["size"], 8);
    assert_eq!(received[1]["payload"], "ping");
    assert_eq!(received[1]["kind"], "-");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn host_publishes_turns_and_receives_commands() {
    let dir = unique_temp_dir("host");
    let sock_path = dir.join("game.sock");
    let endpoint = format!("unix:{}", sock_path.display());

    let listener = spawn_listener(
        &endpoint,
        &["--count", "3", "--command", "select 4", "--command", "end_turn"],
    );
    wait_for_socket(&sock_path, Duration::from_secs(3));

    let host = tickpipe()
        .args(["--log-level", "error", "--format", "json", "host", &endpoint])
        .args(["--ticks", "20", "--tick", "50ms", "--until", "end_turn"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("host command should start");

    let host_output = wait_with_timeout(host, Duration::from_secs(10));
    assert!(host_output.status.success(), "host failed: {host_output:?}");
    let commands = json_lines(&host_output);
    let names: Vec<&str> = commands
        .iter()
        .filter_map(|line| line["command"].as_str())
        .collect();
    assert_eq!(names, vec!["select 4", "end_turn"]);
    // One command per turn.
    assert!(commands[0]["turn"].as_i64() < commands[1]["turn"].as_i64());

    let listener_output = wait_with_timeout(listener, Duration::from_secs(5));
    assert!(listener_output.status.success());
    let statuses = json_lines(&listener_output);
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[0]["kind"], "turn_start");
    assert_eq!(statuses[0]["turn"], 1);
    assert_eq!(statuses[0]["payload"]["state"]["tick"], 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn host_runs_without_counterpart() {
    let dir = unique_temp_dir("absent");
    let endpoint = format!("unix:{}", dir.join("nobody.sock").display());

    let output = tickpipe()
        .args(["--log-level", "error", "--format", "json", "host", &endpoint])
        .args(["--ticks", "3", "--tick", "10ms"])
        .output()
        .expect("host should run");
    assert!(output.status.success(), "host failed: {output:?}");
    assert!(json_lines(&output).is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn host_writes_log_file() {
    let dir = unique_temp_dir("logfile");
    let log_path = dir.join("host.log");
    let endpoint = format!("unix:{}", dir.join("nobody.sock").display());

    let output = tickpipe()
        .args(["--log-level", "debug", "--log-file"])
        .arg(&log_path)
        .args(["host", &endpoint, "--ticks", "2", "--tick", "10ms"])
        .output()
        .expect("host should run");
    assert!(output.status.success(), "host failed: {output:?}");

    let log = std::fs::read_to_string(&log_path).expect("log file should exist");
    assert!(log.contains("attempting to open channel for the first time"));
    assert!(log.contains("channel unavailable"));
    assert!(log.contains("shutting down"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_without_counterpart_fails() {
    let dir = unique_temp_dir("nosend");
    let endpoint = format!("unix:{}", dir.join("nobody.sock").display());

    let output = tickpipe()
        .args(["--log-level", "error", "send", &endpoint, "--data", "ping"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("send failed"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_rejects_invalid_json() {
    let output = tickpipe()
        .args(["send", "unix:/tmp/unused.sock", "--json", "{nope"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_package_version() {
    let output = tickpipe()
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("tickpipe {}", env!("CARGO_PKG_VERSION"))
    );
}
