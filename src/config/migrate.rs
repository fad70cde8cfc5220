//! Keeps an existing configuration file in step with the current `Config`
//! shape: keys added in later releases are reported by `missing_keys` and
//! written with their defaults by `migrate_file`.

use super::Config;
use crate::errors::{AppError, AppResult};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

fn default_mapping() -> AppResult<Mapping> {
    let value = serde_yaml::to_value(Config::default()).map_err(|e| AppError::Config(e.to_string()))?;
    match value {
        Value::Mapping(m) => Ok(m),
        _ => Err(AppError::Config("default configuration is not a mapping".into())),
    }
}

fn read_mapping(path: &Path) -> AppResult<Mapping> {
    let content = fs::read_to_string(path)?;
    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Mapping(m)) => Ok(m),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err(AppError::Config(format!("{} is not a YAML mapping", path.display()))),
        Err(e) => Err(AppError::Config(format!("cannot parse {}: {e}", path.display()))),
    }
}

/// Keys the current release knows but the file does not carry.
pub fn missing_keys(path: &Path) -> AppResult<Vec<String>> {
    let current = read_mapping(path)?;
    Ok(default_mapping()?
        .keys()
        .filter(|k| !current.contains_key(*k))
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect())
}

/// Add every missing key with its default. Existing values are never touched.
/// Returns the keys that were added.
pub fn migrate_file(path: &Path) -> AppResult<Vec<String>> {
    let mut current = read_mapping(path)?;
    let mut added = Vec::new();

    for (k, v) in default_mapping()? {
        if !current.contains_key(&k) {
            if let Some(name) = k.as_str() {
                added.push(name.to_string());
            }
            current.insert(k, v);
        }
    }

    if !added.is_empty() {
        let serialized = serde_yaml::to_string(&Value::Mapping(current))
            .map_err(|e| AppError::Config(e.to_string()))?;
        fs::write(path, serialized)?;
    }

    Ok(added)
}
