//! Integration tests for the cloudmap CLI
//!
//! These tests run the compiled binary end-to-end.

use std::io::Write;
use std::process::Command;

/// Get the path to the cloudmap binary
fn cloudmap_binary() -> std::path::PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test executable name
    path.pop(); // Remove deps directory

    path.push("cloudmap");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    path
}

/// Run cloudmap with an empty config so the user's home directory is not read
fn run_cloudmap(args: &[&str]) -> std::process::Output {
    let config = tempfile::NamedTempFile::new().unwrap();
    Command::new(cloudmap_binary())
        .arg("--config")
        .arg(config.path())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute cloudmap")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_cloudmap_version() {
    let output = run_cloudmap(&["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("cloudmap"));
}

#[test]
fn test_cloudmap_help() {
    let output = run_cloudmap(&["--help"]);

    assert!(output.status.success());

    let stdout = stdout(&output);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("Commands:"));
    assert!(stdout.contains("coerce"));
    assert!(stdout.contains("render"));
}

#[test]
fn test_coerce_six_digit_string() {
    let output = run_cloudmap(&["coerce", "--tag", "six-digit-string", "5"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "\"000005\"");
}

#[test]
fn test_coerce_tags_list() {
    let output = run_cloudmap(&["coerce", "--tag", "tags", "env:prod", "team:core"]);

    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value[1]["Key"], "team");
    assert_eq!(value[1]["Value"], "core");
}

#[test]
fn test_coerce_invalid_value_fails() {
    let output = run_cloudmap(&["coerce", "--tag", "int64", "ten"]);

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot coerce 'ten'"));
}

#[test]
fn test_unknown_tag_is_rejected() {
    let output = run_cloudmap(&["coerce", "--tag", "uint128", "1"]);

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown type tag"));
}

#[test]
fn test_render_create_instance() {
    let output = run_cloudmap(&[
        "render",
        "create-instance",
        "-p",
        "image=ami-123",
        "-p",
        "count=2",
        "-p",
        "role=web",
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["ImageId"], "ami-123");
    assert_eq!(value["MinCount"], 2);
    assert_eq!(value["MaxCount"], 2);
    assert_eq!(value["IamInstanceProfile"]["Name"], "web");
}

#[test]
fn test_render_userdata_with_template_data() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("boot.sh");
    let data = dir.path().join("data.json");
    std::fs::write(&script, "echo {{env}}").unwrap();
    let mut file = std::fs::File::create(&data).unwrap();
    write!(file, "{{\"env\": \"prod\"}}").unwrap();

    let userdata = format!("userdata={}", script.display());
    let output = run_cloudmap(&[
        "render",
        "create-instance",
        "-p",
        "image=ami-1",
        "-p",
        &userdata,
        "--template-data",
        data.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    // base64 of "echo prod"
    assert_eq!(value["UserData"], "ZWNobyBwcm9k");
}

#[test]
fn test_render_unknown_command() {
    let output = run_cloudmap(&["render", "delete-bucket", "-p", "id=x"]);

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown command: delete-bucket"));
}

#[test]
fn test_commands_lists_bundled_commands() {
    let output = run_cloudmap(&["commands"]);

    assert!(output.status.success());

    let stdout = stdout(&output);
    assert!(stdout.contains("create-instance"));
    assert!(stdout.contains("start-containers"));
}

#[test]
fn test_path_parse() {
    let output = run_cloudmap(&["path", "Instances[0]InstanceId"]);

    assert!(output.status.success());

    let stdout = stdout(&output);
    assert!(stdout.contains("field Instances"));
    assert!(stdout.contains("list index 0"));
    assert!(stdout.contains("field InstanceId"));
}

#[test]
fn test_path_rejects_nonzero_index() {
    let output = run_cloudmap(&["path", "Instances[1]InstanceId"]);

    assert!(!output.status.success());
}
