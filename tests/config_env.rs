// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Verify channel configuration loading from files and the environment.
// Author: Lukas Bower

use std::env;
use std::fs;

use diagchan::config::{ENV_BASELINE, ENV_DIR, ENV_MAX_CAPACITY, ENV_OUTPUT};
use diagchan::{ChannelConfig, ConfigError};
use serial_test::serial;
use tempfile::tempdir;

fn clear_env() {
    for var in [ENV_DIR, ENV_OUTPUT, ENV_BASELINE, ENV_MAX_CAPACITY] {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("channel.json");
    fs::write(&path, r#"{"dir_name":"from_file","baseline_capacity":128}"#).expect("write");

    clear_env();
    env::set_var(ENV_DIR, "from_env");
    env::set_var(ENV_MAX_CAPACITY, "4096");
    let config = ChannelConfig::from_file(&path)
        .and_then(ChannelConfig::apply_env)
        .expect("config");
    clear_env();

    assert_eq!(config.dir_name, "from_env");
    assert_eq!(config.baseline_capacity, 128);
    assert_eq!(config.max_capacity, Some(4096));
}

#[test]
#[serial]
fn malformed_override_is_reported() {
    clear_env();
    env::set_var(ENV_BASELINE, "big");
    let result = ChannelConfig::default().apply_env();
    clear_env();
    match result {
        Err(ConfigError::Env { var, value }) => {
            assert_eq!(var, ENV_BASELINE);
            assert_eq!(value, "big");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
#[serial]
fn unset_environment_keeps_defaults() {
    clear_env();
    let config = ChannelConfig::default().apply_env().expect("config");
    assert_eq!(config, ChannelConfig::default());
}

#[test]
fn missing_file_reports_its_path() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");
    match ChannelConfig::from_file(&path) {
        Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
}
