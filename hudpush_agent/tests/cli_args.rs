//! CLI surface of the hudpush_agent binary. None of these reach the GPU driver.
use assert_cmd::Command;

#[test]
fn help_mentions_short_and_long_flags() {
    let dir = tempfile::tempdir().unwrap();
    let out = Command::cargo_bin("hudpush_agent")
        .unwrap()
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("--help")
        .output()
        .expect("run hudpush_agent --help");
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    for flag in ["--url", "-u", "--interval-ms", "-i", "--timeout-ms", "--prefix", "--config", "HUDPUSH_URL"] {
        assert!(text.contains(flag), "help text missing {flag}\n{text}");
    }
}

#[test]
fn unknown_argument_fails_with_usage_once() {
    let out = Command::cargo_bin("hudpush_agent")
        .unwrap()
        .arg("--definitely-not-a-flag")
        .output()
        .expect("run hudpush_agent");
    assert_eq!(out.status.code(), Some(2));
    let err = String::from_utf8_lossy(&out.stderr);
    assert_eq!(
        err.matches("unexpected argument: --definitely-not-a-flag").count(),
        1,
        "{err}"
    );
    assert!(err.contains("Usage:"), "{err}");
}

#[test]
fn invalid_url_fails_before_touching_the_driver() {
    let dir = tempfile::tempdir().unwrap();
    let out = Command::cargo_bin("hudpush_agent")
        .unwrap()
        .env("XDG_CONFIG_HOME", dir.path())
        .env_remove("HUDPUSH_URL")
        .args(["--url", "not a url"])
        .output()
        .expect("run hudpush_agent");
    assert!(!out.status.success());
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(text.contains("url"), "{text}");
}
