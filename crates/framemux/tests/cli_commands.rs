#![cfg(feature = "cli")]

use std::io;
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Stdio};
use std::sync::mpsc::sync_channel;
use std::thread;
use std::time::{Duration, Instant};

use framemux_conn::{Client, Server};

fn free_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("probe listener should bind");
    listener
        .local_addr()
        .expect("probe listener should have an address")
        .to_string()
}

fn wait_for_connect(addr: &str, timeout: Duration) -> io::Result<TcpStream> {
    let start = Instant::now();
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(io::Error::other(format!("connect timeout: {err}")));
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_framemux"))
        .arg("version")
        .output()
        .expect("version command should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("framemux {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn listen_prints_values_and_reports_success() {
    let addr = free_addr();
    let child = Command::new(env!("CARGO_BIN_EXE_framemux"))
        .args(["--log-level", "error", "--format", "json"])
        .args(["listen", &addr, "--frame-type", "7", "--count", "2"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen command should start");

    let stream = wait_for_connect(&addr, Duration::from_secs(5)).expect("listener should accept");
    let client = Client::with_defaults(stream).expect("client should build");

    thread::scope(|s| {
        let reader = s.spawn(|| client.recv());
        client.send(7, "first").expect("first value should send");
        client.send(7, "second").expect("second value should send");

        client.wait().expect("listener should report success");
        reader.join().expect("no panic").expect("recv should end cleanly");
    });

    let output = child.wait_with_output().expect("listen should exit");
    assert!(
        output.status.success(),
        "listen failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["value"], "first");
    assert_eq!(lines[1]["value"], "second");
    assert_eq!(lines[1]["frame_type"], 7);
}

#[test]
fn send_exits_nonzero_on_remote_error() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener.local_addr().expect("listener address").to_string();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("server should accept");
        let server = Server::with_defaults(stream).expect("server should build");
        let (tx, rx) = sync_channel::<String>(1);
        server.receive(3, server.string_receiver(tx));

        thread::scope(|s| {
            let reader = s.spawn(|| server.recv());
            let value = rx.recv().expect("value should arrive");
            server
                .done(Some(&io::Error::other(format!("cannot handle {value}"))))
                .expect("done should send");
            reader.join().expect("no panic").expect("recv should end cleanly");
        });
    });

    let output = Command::new(env!("CARGO_BIN_EXE_framemux"))
        .args(["--log-level", "error"])
        .args(["send", &addr, "--data", "payload", "--timeout", "5s"])
        .output()
        .expect("send command should run");

    server.join().expect("server thread should complete");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("cannot handle payload"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn send_and_listen_agree_on_json_encoding() {
    let addr = free_addr();
    let listener = Command::new(env!("CARGO_BIN_EXE_framemux"))
        .args(["--log-level", "error", "--encoding", "json", "--format", "raw"])
        .args(["listen", &addr, "--count", "1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen command should start");

    let sender = send_with_retry(&addr, &["--encoding", "json", "--data", "hello over json"]);
    assert!(
        sender.status.success(),
        "send failed: {}",
        String::from_utf8_lossy(&sender.stderr)
    );

    let output = listener.wait_with_output().expect("listen should exit");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello over json");
}

/// Run `framemux send`, retrying while the listener is still starting up.
fn send_with_retry(addr: &str, extra: &[&str]) -> std::process::Output {
    let start = Instant::now();
    loop {
        let output = Command::new(env!("CARGO_BIN_EXE_framemux"))
            .args(["--log-level", "error", "send", addr])
            .args(extra)
            .output()
            .expect("send command should run");

        let refused = String::from_utf8_lossy(&output.stderr).contains("connect failed");
        if !refused || start.elapsed() >= Duration::from_secs(5) {
            return output;
        }
        thread::sleep(Duration::from_millis(25));
    }
}
