use std::process::Command;

const BINARY: &str = env!("CARGO_BIN_EXE_opencode-events");

#[test]
fn test_version_flag() {
    let output = Command::new(BINARY)
        .arg("--version")
        .output()
        .expect("Failed to execute binary");

    assert!(
        output.status.success(),
        "Version flag should exit with code 0"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version_part = stdout
        .trim()
        .strip_prefix("opencode-events ")
        .expect("Version output should start with 'opencode-events '");
    assert_eq!(version_part, env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_short_version_flag() {
    let output = Command::new(BINARY)
        .arg("-V")
        .output()
        .expect("Failed to execute binary");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("opencode-events "));
}

#[test]
fn test_help_flag_prints_usage() {
    let output = Command::new(BINARY)
        .arg("--help")
        .output()
        .expect("Failed to execute binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("USAGE:"));
    assert!(stdout.contains("OPENCODE_URL"));
}

#[test]
fn test_invalid_url_fails() {
    let output = Command::new(BINARY)
        .arg("ftp://example.com")
        .output()
        .expect("Failed to execute binary");

    assert!(!output.status.success(), "Unsupported scheme should fail");
}
