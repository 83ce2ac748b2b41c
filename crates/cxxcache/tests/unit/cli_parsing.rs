use clap::Parser;
use cxxcache::cli::{Cli, Commands};

#[test]
fn parses_serve() {
    let cli = Cli::parse_from(["cxxcache", "serve"]);
    assert!(matches!(cli.command, Commands::Serve));
}

#[test]
fn parses_index_with_workspace_id() {
    let cli = Cli::parse_from(["cxxcache", "index", "--workspace-id", "ws1"]);
    match cli.command {
        Commands::Index { workspace_id, payload } => {
            assert_eq!(workspace_id, "ws1");
            assert_eq!(payload, "");
        }
        other => panic!("expected Index, got {other:?}"),
    }
}

#[test]
fn parses_invalidate_with_repeated_file_keys() {
    let cli = Cli::parse_from([
        "cxxcache",
        "invalidate",
        "--context-id",
        "ctx1",
        "--file-key",
        "repoA:a.cpp",
        "--file-key",
        "repoA:b.cpp",
    ]);
    match cli.command {
        Commands::Invalidate { context_id, file_keys } => {
            assert_eq!(context_id, "ctx1");
            assert_eq!(file_keys, vec!["repoA:a.cpp".to_owned(), "repoA:b.cpp".to_owned()]);
        }
        other => panic!("expected Invalidate, got {other:?}"),
    }
}

#[test]
fn accepts_global_config_flag_before_subcommand() {
    let cli = Cli::parse_from(["cxxcache", "--config", "cxxcache.toml", "serve"]);
    assert_eq!(cli.config.as_deref(), Some("cxxcache.toml"));
}
