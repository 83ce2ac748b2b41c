use std::path::PathBuf;
use std::process::Command;

fn cxxcache_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cxxcache"))
}

#[test]
fn help_exits_zero_and_lists_subcommands() {
    let output = Command::new(cxxcache_bin()).arg("--help").output().expect("spawn cxxcache --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("index"));
    assert!(stdout.contains("invalidate"));
}

#[test]
fn index_without_required_workspace_id_fails_with_usage_error() {
    let output = Command::new(cxxcache_bin()).arg("index").output().expect("spawn cxxcache index");
    assert!(!output.status.success());
}
