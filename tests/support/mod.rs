use anyhow::{Context, Result};
use assert_cmd::Command;
use capprobe::{Harness, JsonNamespace};
use serde_json::{Value, json};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Namespace shaped like a typical executor environment: a few globals, a
/// nested library table, and some values that are deliberately unusable.
pub fn fixture_namespace() -> Value {
    json!({
        "alpha": "<function>",
        "beta": "<function>",
        "getgenv": "<function>",
        "identifyexecutor": "<function>",
        "crypt": {
            "base64encode": "<function>",
            "base64": {"encode": "<function>", "decode": "<function>"},
            "hash": null
        },
        "drawing": {"fonts": ["UI", "System", "Plex"]},
        "version": "2.4.1"
    })
}

pub fn fixture_harness() -> Harness {
    let namespace = JsonNamespace::from_value(fixture_namespace()).expect("fixture namespace");
    Harness::new(Arc::new(namespace))
}

pub fn write_json(value: &Value) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new().context("failed to allocate fixture file")?;
    serde_json::to_writer(&mut file, value)?;
    file.flush()?;
    Ok(file)
}

pub fn capprobe() -> Command {
    let mut cmd = Command::cargo_bin("capprobe").expect("capprobe binary");
    cmd.env_remove("CAPPROBE_RANKS")
        .env_remove("CAPPROBE_TIMEOUT_MS")
        .env_remove("CAPPROBE_GRACE_MS")
        .env_remove("RUST_LOG");
    cmd
}
