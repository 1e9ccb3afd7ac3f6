#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::Path;
use std::time::Duration;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(30);

/// Env var holding the generation key in test configs.
#[allow(dead_code)]
pub const TEST_KEY_ENV: &str = "REPLICA_TEST_API_KEY";

/// A `replica` command isolated from the user's configuration.
#[allow(dead_code)]
pub fn replica_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("replica"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env_remove("REPLICA_CONFIG");
    cmd.env_remove("REPLICA_MODEL");
    cmd.env_remove("REPLICA_GENERATION_TIMEOUT_SECS");
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Write a config file pointing the generator at `endpoint`.
#[allow(dead_code)]
pub fn write_config(dir: &Path, endpoint: &str, timeout_secs: u64) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let content = format!(
        "[generation]\nendpoint = \"{endpoint}\"\nmodel = \"test-model\"\napi_key_env = \"{TEST_KEY_ENV}\"\ntimeout_secs = {timeout_secs}\n\n[fetch]\ntimeout_secs = 5\n"
    );
    std::fs::write(&path, content).expect("write test config");
    path
}

#[allow(dead_code)]
pub const SAMPLE_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Sample</title>
<style>body { font-family: 'Helvetica Neue', sans-serif; color: #112233; } @media (max-width: 768px) { body { margin: 8px; } }</style>
<link rel="stylesheet" href="/main.css">
</head><body>
<nav><ul><li><a href="/1">1</a></li><li><a href="/2">2</a></li><li><a href="/3">3</a></li><li><a href="/4">4</a></li><li><a href="/5">5</a></li></ul></nav>
<img src="/hero.png" width="1200" height="600" alt="Hero">
<h1>Sample</h1><p>Body text</p>
</body></html>"#;
