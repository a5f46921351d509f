//! In-place edits of node JSON files (genesis, client config)

use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

use crate::error::{BringupError, Result};

/// Set `value` at a dotted `path`, creating intermediate objects.
///
/// Non-object intermediates are replaced by objects.
pub fn set_path(doc: &mut Map<String, Value>, path: &str, value: Value) {
    let mut parts = path.split('.').peekable();
    let mut current = doc;

    while let Some(key) = parts.next() {
        if parts.peek().is_none() {
            current.insert(key.to_string(), value);
            return;
        }
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(map) = entry else {
            return;
        };
        current = map;
    }
}

/// Apply `changes` to the JSON object stored at `path`
pub async fn patch_json_file<'a, I>(path: &Path, changes: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BringupError::io(path, e))?;
    let mut doc: Value = serde_json::from_str(&raw).map_err(|source| BringupError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(map) = &mut doc else {
        return Err(BringupError::NotAnObject(path.to_path_buf()));
    };

    for (key, value) in changes {
        debug!(file = %path.display(), key, %value, "Applying override");
        set_path(map, key, value.clone());
    }

    let rendered = serde_json::to_string_pretty(&doc).map_err(|source| BringupError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, rendered)
        .await
        .map_err(|e| BringupError::io(path, e))
}

/// Read a JSON object from `path`
pub async fn read_json_object(path: &Path) -> Result<Map<String, Value>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BringupError::io(path, e))?;
    match serde_json::from_str(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(BringupError::NotAnObject(path.to_path_buf())),
        Err(source) => Err(BringupError::Json {
            path: path.to_path_buf(),
            source,
        }),
    }
}
