//! facetdb subcommands against the in-memory backend.

use clap::Parser;
use facetdb_cli::{commands, load_config, Cli, Command};
use facetdb_store::test_utils::InMemoryBackend;
use facetdb_store::KvStore;
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

fn store() -> KvStore {
    KvStore::with_defaults(Arc::new(InMemoryBackend::new()))
}

#[tokio::test]
async fn test_import_then_export() {
    let store = store();
    let input = json!([
        {"pk": "user#2", "sk": "profile", "name": "Bo"},
        {"pk": "user#1", "sk": "profile", "name": "Ann"}
    ])
    .to_string();

    let imported = commands::import(&store, input.as_bytes()).await.unwrap();
    assert_eq!(imported, 2);

    let mut out = Vec::new();
    let exported = commands::export(&store, &mut out, false).await.unwrap();
    assert_eq!(exported, 2);

    let parsed: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed[0]["name"], "Ann");
    assert_eq!(parsed[1]["name"], "Bo");
}

#[tokio::test]
async fn test_import_rejects_non_array() {
    let err = commands::import(&store(), &b"{\"pk\": \"a\"}"[..]).await.unwrap_err();
    assert!(err.to_string().contains("JSON array"));
}

#[tokio::test]
async fn test_import_rejects_items_without_keys() {
    let err = commands::import(&store(), &b"[{\"pk\": \"a\"}]"[..]).await.unwrap_err();
    assert!(err.to_string().contains("Import failed"));
}

#[tokio::test]
async fn test_truncate_requires_confirmation() {
    let store = store();
    commands::import(&store, &b"[{\"pk\": \"a\", \"sk\": \"1\"}]"[..]).await.unwrap();

    assert!(commands::truncate(&store, false).await.is_err());
    assert_eq!(commands::truncate(&store, true).await.unwrap(), 1);
}

#[tokio::test]
async fn test_stats_output() {
    let store = store();
    let input = json!([
        {"pk": "a", "sk": "1"}, {"pk": "a", "sk": "2"}, {"pk": "b", "sk": "1"}
    ])
    .to_string();
    commands::import(&store, input.as_bytes()).await.unwrap();

    let mut out = Vec::new();
    commands::stats(&store, &mut out).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("items:      3"));
    assert!(text.contains("partitions: 2"));
}

#[test]
fn test_parse_subcommands() {
    let cli = Cli::try_parse_from(["facetdb", "export", "--pretty", "-o", "dump.json"]).unwrap();
    assert_eq!(
        cli.command,
        Command::Export {
            output: Some(PathBuf::from("dump.json")),
            pretty: true
        }
    );

    let cli = Cli::try_parse_from(["facetdb", "truncate", "--yes", "--config", "facet.toml"]).unwrap();
    assert_eq!(cli.command, Command::Truncate { yes: true });
    assert_eq!(cli.config, Some(PathBuf::from("facet.toml")));

    assert!(Cli::try_parse_from(["facetdb"]).is_err());
    assert!(Cli::try_parse_from(["facetdb", "import"]).is_err());
}

#[test]
fn test_load_config_with_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[storage]\nengine = \"memory\"\n\n[limits]\ntransact_write_ceiling = 10"
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let cli = Cli::try_parse_from([
        "facetdb",
        "--config",
        path.as_str(),
        "--data-path",
        "/tmp/facet-data",
        "--log-level",
        "debug",
        "stats",
    ])
    .unwrap();

    let config = load_config(&cli).unwrap();
    assert_eq!(config.storage.engine, "memory");
    assert_eq!(config.storage.data_path, "/tmp/facet-data");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.limits.transact_write_ceiling, 10);
}

#[test]
fn test_load_config_rejects_invalid_level() {
    let cli = Cli::try_parse_from(["facetdb", "--log-level", "loud", "stats"]).unwrap();
    assert!(load_config(&cli).is_err());
}
