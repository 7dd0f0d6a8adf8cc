//! YAML config files merged into a single mapping.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::{CoreError, Result};

/// Recursively merge `update` into `base`.
///
/// Nested mappings present on both sides are merged key by key; any other
/// value from `update` replaces the one in `base`.
pub fn deep_update(mut base: Mapping, update: Mapping) -> Mapping {
    for (key, value) in update {
        if let Value::Mapping(incoming) = value {
            if let Some(Value::Mapping(existing)) = base.get_mut(&key) {
                let current = std::mem::take(existing);
                *existing = deep_update(current, incoming);
                continue;
            }
            base.insert(key, Value::Mapping(incoming));
        } else {
            base.insert(key, value);
        }
    }
    base
}

/// Sort every sequence nested in `mapping`, so configs can be compared
/// regardless of list order.
///
/// Scalars order numbers before strings before booleans; mappings and
/// sequences keep their relative order.
pub fn sort_list(mapping: Mapping) -> Mapping {
    mapping
        .into_iter()
        .map(|(key, value)| (key, sort_value(value)))
        .collect()
}

fn sort_value(value: Value) -> Value {
    match value {
        Value::Mapping(mapping) => Value::Mapping(sort_list(mapping)),
        Value::Sequence(items) => {
            let mut items: Vec<Value> = items.into_iter().map(sort_value).collect();
            items.sort_by(compare_values);
            Value::Sequence(items)
        }
        other => other,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Bool(_) => 3,
        _ => 4,
    }
}

/// Load and merge YAML config files, later files overriding earlier ones.
///
/// Every path must exist; an empty document counts as an empty mapping.
/// With `key`, only the mapping stored under that top-level key is returned
/// (empty when the key is absent or null).
pub fn load_config<P: AsRef<Path>>(paths: &[P], key: Option<&str>) -> Result<Mapping> {
    let mut merged = Mapping::new();
    let mut last_path = PathBuf::new();

    for path in paths {
        let path = path.as_ref();
        merged = deep_update(merged, read_mapping(path)?);
        last_path = path.to_path_buf();
    }

    let Some(key) = key else {
        return Ok(merged);
    };

    match merged.remove(key) {
        None | Some(Value::Null) => Ok(Mapping::new()),
        Some(Value::Mapping(section)) => Ok(section),
        Some(_) => Err(CoreError::InvalidConfig {
            path: last_path,
            detail: format!("`{}` is not a mapping", key),
        }),
    }
}

fn read_mapping(path: &Path) -> Result<Mapping> {
    if !path.exists() {
        return Err(CoreError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Mapping::new());
    }

    let document: Value =
        serde_yaml::from_str(&content).map_err(|source| CoreError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    match document {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(CoreError::InvalidConfig {
            path: path.to_path_buf(),
            detail: "top level must be a mapping".to_string(),
        }),
    }
}
