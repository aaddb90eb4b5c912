//! Settings loading.
//!
//! Layers, lowest priority first:
//! 1. compiled [`HearthSettings::default()`]
//! 2. `~/.hearth/settings.json`, deep-merged over the defaults
//! 3. `HEARTH_*` environment variables

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::HearthSettings;

/// Resolve the path to the settings file (`~/.hearth/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".hearth").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<HearthSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an out-of-range value is
/// an error.
pub fn load_settings_from_path(path: &Path) -> Result<HearthSettings> {
    let defaults = serde_json::to_value(HearthSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: HearthSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive merge of `source` over `target`.
///
/// Objects merge per key, arrays and primitives are replaced, and `null` in
/// `source` keeps the target value.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

fn validate(settings: &HearthSettings) -> Result<()> {
    if settings.transport.channel_capacity == 0 {
        return Err(SettingsError::InvalidValue(
            "transport.channelCapacity must be at least 1".into(),
        ));
    }
    if settings.sync.fetch_timeout_ms == Some(0) {
        return Err(SettingsError::InvalidValue(
            "sync.fetchTimeoutMs must be positive or omitted".into(),
        ));
    }
    Ok(())
}

/// Apply `HEARTH_*` environment overrides. Unparseable values are logged and
/// ignored.
pub fn apply_env_overrides(settings: &mut HearthSettings) {
    if let Some(v) = read_env_u64("HEARTH_FETCH_TIMEOUT_MS", 1, 3_600_000) {
        settings.sync.fetch_timeout_ms = Some(v);
    }
    if let Some(v) = read_env_string("HEARTH_CONTEXT") {
        settings.sync.default_context = v;
    }
    if let Some(v) = read_env_u64("HEARTH_CHANNEL_CAPACITY", 1, 65_536) {
        settings.transport.channel_capacity = v as usize;
    }
    if let Some(v) = read_env_string("HEARTH_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("HEARTH_LOG_JSON") {
        settings.logging.json = v;
    }
}

/// Accepts (case-insensitive) `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid integer env var, ignoring");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_nested_keeps_siblings() {
        let target = json!({"sync": {"defaultContext": "a", "coordinatorSubscriber": "c"}});
        let source = json!({"sync": {"defaultContext": "b"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["sync"]["defaultContext"], "b");
        assert_eq!(merged["sync"]["coordinatorSubscriber"], "c");
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_replaces() {
        let merged = deep_merge(json!({"items": [1, 2, 3]}), json!({"items": [4]}));
        assert_eq!(merged["items"], json!([4]));
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = load_settings_from_path(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.name, "hearth");
        assert_eq!(settings.transport.channel_capacity, 256);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"sync": {"fetchTimeoutMs": 2500}, "logging": {"json": true}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.sync.fetch_timeout_ms, Some(2500));
        assert!(settings.logging.json);
        assert_eq!(settings.sync.default_context, "main-window");
    }

    #[test]
    fn each_load_reads_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        std::fs::write(&first, r#"{"name": "first"}"#).unwrap();
        std::fs::write(&second, r#"{"name": "second"}"#).unwrap();

        assert_eq!(load_settings_from_path(&first).unwrap().name, "first");
        assert_eq!(load_settings_from_path(&second).unwrap().name, "second");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_settings_from_path(&path);
        assert!(matches!(result, Err(SettingsError::Json(_))));
    }

    #[test]
    fn load_zero_capacity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"transport": {"channelCapacity": 0}}"#).unwrap();

        let result = load_settings_from_path(&path);
        assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("10", 1, 100), Some(10));
        assert_eq!(parse_u64_range("0", 1, 100), None);
        assert_eq!(parse_u64_range("101", 1, 100), None);
        assert_eq!(parse_u64_range("abc", 1, 100), None);
    }
}
