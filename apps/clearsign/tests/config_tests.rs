//! Configuration file loading.

#![allow(clippy::unwrap_used, clippy::panic)]

use clearsign::config::{ConfigError, DEFAULT_GAS_LIMIT, DEFAULT_KG_CHAIN_ID, PipelineConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn file_values_overlay_defaults() {
    let config = PipelineConfig::from_toml_str(
        r#"
        publisher_url = "http://localhost:31415"
        chain_id = 11155111
        contract_address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        kg_space_id = "space-under-test"
        "#,
    )
    .unwrap();

    assert_eq!(config.publisher_url, "http://localhost:31415");
    assert_eq!(
        config.anchor_target().unwrap(),
        (11155111, "0x5fbdb2315678afecb367f032d93f642f64180aa3")
    );
    assert_eq!(config.kg_space_id, "space-under-test");
    assert_eq!(config.kg_chain_id, DEFAULT_KG_CHAIN_ID);
    assert_eq!(config.gas_limit, DEFAULT_GAS_LIMIT);
    assert!(config.wallet_rpc_url.is_none());
}

#[test]
fn load_reads_file_from_disk() {
    let file = write_config(
        r#"
        wallet_rpc_url = "http://127.0.0.1:8545"
        kg_chain_id = 80451
        gas_limit = 300000
        "#,
    );

    let config = PipelineConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.wallet_rpc_url.as_deref(), Some("http://127.0.0.1:8545"));
    assert_eq!(config.kg_chain_id, 80451);
    assert_eq!(config.gas_limit, 300_000);
}

#[test]
fn env_overrides_file_values() {
    let config = PipelineConfig::from_toml_str(r#"gas_limit = 300000"#)
        .unwrap()
        .with_overrides(|var| (var == "CLEARSIGN_GAS_LIMIT").then(|| "0x61a80".to_string()))
        .unwrap();

    assert_eq!(config.gas_limit, 400_000);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = PipelineConfig::from_toml_str(r#"publisher = "http://typo""#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn wrong_types_are_rejected() {
    let err = PipelineConfig::from_toml_str(r#"chain_id = "one""#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = PipelineConfig::load(Some(&path)).unwrap_err();

    match err {
        ConfigError::Read { path: reported, .. } => assert!(reported.ends_with("absent.toml")),
        other => panic!("unexpected error: {other}"),
    }
}
