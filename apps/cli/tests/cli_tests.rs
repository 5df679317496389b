//! Runs the `wait-for` binary end to end

use std::net::TcpListener;
use std::process::{Command, Output};

use tempfile::TempDir;

fn wait_for(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wait-for"))
        .args(args)
        .current_dir(dir.path())
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn listener() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            drop(stream);
        }
    });
    addr.to_string()
}

#[test]
fn test_no_targets() {
    let dir = TempDir::new().unwrap();
    let output = wait_for(&dir, &[]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "Error: no targets specified");
}

#[test]
fn test_target_up() {
    let dir = TempDir::new().unwrap();
    let addr = listener();
    let output = wait_for(&dir, &["-s", &addr, "-t", "5s"]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        [
            format!("Waiting for targets: \"{addr}\" (timeout: 5s, attempting every 1s)").as_str(),
            "All targets are up and responding.",
        ]
    );
}

#[test]
fn test_verbose_banner_and_progress() {
    let dir = TempDir::new().unwrap();
    let addr = listener();
    let output = wait_for(&dir, &["-v", "--host", &format!("tcp://{addr}")]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(&format!(
        "Waiting for targets: \"tcp://{addr}\" (timeout: 10s, attempting every 1s)"
    )));
    assert!(stdout.contains(&format!("> up:   tcp://{addr} (after ")));
}

#[test]
fn test_unsupported_scheme() {
    let dir = TempDir::new().unwrap();
    let output = wait_for(&dir, &["-s", "ftp://example.com:21"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error: failed to parse target \"ftp://example.com:21\""), "{stderr}");
}

#[test]
fn test_deadline() {
    let dir = TempDir::new().unwrap();
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let output = wait_for(&dir, &["-s", &closed, "-t", "500ms", "-e", "100ms"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim(),
        "Error: 500ms timeout reached before all targets were up"
    );
}

#[test]
fn test_targets_from_config_file() {
    let dir = TempDir::new().unwrap();
    let addr = listener();
    std::fs::write(
        dir.path().join("targets.toml"),
        format!("host = [\"{addr}\"]\ntimeout = \"5s\"\n"),
    )
    .unwrap();

    let output = wait_for(&dir, &[]);
    assert!(output.status.success(), "{output:?}");
}

#[test]
fn test_verbose_from_config_file() {
    let dir = TempDir::new().unwrap();
    let addr = listener();
    std::fs::write(dir.path().join("targets.toml"), format!("host = [\"{addr}\"]\nverbose = true\n"))
        .unwrap();

    let output = wait_for(&dir, &[]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("> up:   tcp://{addr} (after ")), "{stdout}");
}

#[test]
fn test_missing_explicit_config() {
    let dir = TempDir::new().unwrap();
    let output = wait_for(&dir, &["--config", "absent.toml", "-s", "localhost:80"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error: error reading config file"), "{stderr}");
}
