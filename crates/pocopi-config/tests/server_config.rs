//! Server config validation tests for pocopi-config.
// crates/pocopi-config/tests/server_config.rs
// =============================================================================
// Module: Server Config Validation Tests
// Description: Defaults, limits, and fail-closed checks for pocopi.toml.
// Purpose: Ensure server configuration stays local-first and bounded.
// =============================================================================

use pocopi_config::LogFormat;
use pocopi_config::PocopiConfig;
use pocopi_config::StorageKind;

mod common;

use crate::common::SAMPLE_SERVER_TOML;
use crate::common::TestResult;
use crate::common::assert_invalid;
use crate::common::write_file;

#[test]
fn empty_file_uses_loopback_defaults() -> TestResult {
    let config = PocopiConfig::from_toml_str("").map_err(|err| err.to_string())?;
    let addr = config.server.bind_addr().map_err(|err| err.to_string())?;
    if !addr.ip().is_loopback() || addr.port() != 3000 {
        return Err(format!("unexpected default bind {addr}"));
    }
    if config.server.max_body_bytes != 1024 * 1024 {
        return Err("unexpected default body limit".to_string());
    }
    if config.storage.kind != StorageKind::File || config.storage.data_dir != "data" {
        return Err("unexpected default storage".to_string());
    }
    if config.test.path != "config/pocopi.yaml" {
        return Err("unexpected default test path".to_string());
    }
    if !config.audit.enabled || config.logging.format != LogFormat::Pretty {
        return Err("unexpected audit/logging defaults".to_string());
    }
    Ok(())
}

#[test]
fn sample_server_config_is_valid() -> TestResult {
    PocopiConfig::from_toml_str(SAMPLE_SERVER_TOML).map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn memory_storage_and_json_logging_parse() -> TestResult {
    let config = PocopiConfig::from_toml_str(
        "[storage]\ntype = \"memory\"\n\n[logging]\nlevel = \"pocopi_server=debug\"\nformat = \"json\"\n",
    )
    .map_err(|err| err.to_string())?;
    if config.storage.kind != StorageKind::Memory || config.logging.format != LogFormat::Json {
        return Err("memory/json settings not applied".to_string());
    }
    Ok(())
}

#[test]
fn non_loopback_bind_requires_opt_in() -> TestResult {
    assert_invalid(
        PocopiConfig::from_toml_str("[server]\nbind = \"0.0.0.0:3000\"\n"),
        "non-loopback bind disallowed",
    )?;
    PocopiConfig::from_toml_str("[server]\nbind = \"0.0.0.0:3000\"\nallow_non_loopback = true\n")
        .map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn malformed_bind_is_rejected() -> TestResult {
    assert_invalid(
        PocopiConfig::from_toml_str("[server]\nbind = \"localhost\"\n"),
        "server.bind is not a valid socket address",
    )
}

#[test]
fn body_limit_must_be_bounded() -> TestResult {
    assert_invalid(
        PocopiConfig::from_toml_str("[server]\nmax_body_bytes = 0\n"),
        "server.max_body_bytes must be greater than zero",
    )?;
    assert_invalid(
        PocopiConfig::from_toml_str("[server]\nmax_body_bytes = 1073741824\n"),
        "server.max_body_bytes exceeds limit",
    )
}

#[test]
fn file_storage_requires_data_dir() -> TestResult {
    assert_invalid(
        PocopiConfig::from_toml_str("[storage]\ntype = \"file\"\ndata_dir = \"  \"\n"),
        "storage.data_dir must be non-empty",
    )
}

#[test]
fn overlong_path_components_are_rejected() -> TestResult {
    let long = "a".repeat(300);
    assert_invalid(
        PocopiConfig::from_toml_str(&format!("[audit]\npath = \"logs/{long}.jsonl\"\n")),
        "audit.path path component too long",
    )
}

#[test]
fn empty_log_level_is_rejected() -> TestResult {
    assert_invalid(
        PocopiConfig::from_toml_str("[logging]\nlevel = \"\"\n"),
        "logging.level must be non-empty",
    )
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    assert_invalid(PocopiConfig::from_toml_str("[server]\nport = 80\n"), "config parse error")
}

#[test]
fn load_reads_explicit_path() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = write_file(&dir, "pocopi.toml", "[storage]\ntype = \"memory\"\n")?;
    let config = PocopiConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.storage.kind != StorageKind::Memory {
        return Err("explicit config not loaded".to_string());
    }
    Ok(())
}

#[test]
fn load_rejects_missing_and_oversized_files() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    assert_invalid(PocopiConfig::load(Some(&dir.path().join("absent.toml"))), "config io error")?;
    let padding = format!("# {}\n", "x".repeat(2 * 1024 * 1024));
    let path = write_file(&dir, "big.toml", &padding)?;
    assert_invalid(PocopiConfig::load(Some(&path)), "config file exceeds size limit")
}
