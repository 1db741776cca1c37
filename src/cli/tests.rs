//! Unit tests for CLI commands

use crate::cli::{run, Cli, Commands};
use clap::Parser;
use serde_json::{json, Value};
use std::io::Write;

fn run_to_string(args: &[&str]) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(args)?;
    let mut out = Vec::new();
    run(&cli, &mut out)?;
    Ok(String::from_utf8(out)?)
}

#[test]
fn decode_command_parses_flags() {
    let cli = Cli::try_parse_from(["sigbind", "decode", "-q", "a=1", "--pretty"]).unwrap();
    match cli.command {
        Commands::Decode { query, pretty, .. } => {
            assert_eq!(query, "a=1");
            assert!(pretty);
        }
        other => panic!("Expected Decode command, got {other:?}"),
    }
}

#[test]
fn decode_merges_body_over_query() {
    let out = run_to_string(&[
        "sigbind",
        "decode",
        "--query",
        "?a[x]=0&a[y]=2&tag=1&tag=2",
        "--body",
        r#"{"a": {"x": 1}}"#,
    ])
    .unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value, json!({"a": {"x": 1, "y": ["2"]}, "tag": ["1", "2"]}));
}

#[test]
fn decode_reads_body_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"b": true}}"#).unwrap();
    let path = file.path().to_string_lossy().into_owned();
    let out = run_to_string(&["sigbind", "decode", "--body-file", &path]).unwrap();
    assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), json!({"b": true}));
}

#[test]
fn decode_rejects_invalid_body() {
    let err = run_to_string(&["sigbind", "decode", "--body", "{oops"]).unwrap_err();
    assert!(err.to_string().contains("Invalid Json"));
}

#[test]
fn body_and_body_file_conflict() {
    assert!(Cli::try_parse_from(["sigbind", "decode", "--body", "{}", "--body-file", "x.json"]).is_err());
}

#[test]
fn config_prints_yaml_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api_prefix: rpc").unwrap();
    let path = file.path().to_string_lossy().into_owned();
    let out = run_to_string(&["sigbind", "config", "--file", &path]).unwrap();
    assert!(out.contains("api_prefix: rpc"));
    assert!(out.contains("unknown_fields: raise"));
}

#[test]
fn config_prints_json() {
    let out = run_to_string(&["sigbind", "config", "--format", "json"]).unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert!(value["bool_tokens"]["truthy"].is_array());
}
