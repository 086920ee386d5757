use std::path::{Path, PathBuf};

use nu_plugin::{EngineInterface, EvaluatedCall};
use nu_protocol::{LabeledError, Record, Span, Value};

use crate::config::{self, GalleryConfig};
use crate::error::GalleryError;

/// Convert an `ops` result into a nushell value. Objects become records,
/// arrays of objects become tables.
pub fn json_to_value(json: serde_json::Value, span: Span) -> Value {
    match json {
        serde_json::Value::Null => Value::nothing(span),
        serde_json::Value::Bool(b) => Value::bool(b, span),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::int(i, span),
            None => Value::float(n.as_f64().unwrap_or_default(), span),
        },
        serde_json::Value::String(s) => Value::string(s, span),
        serde_json::Value::Array(items) => Value::list(
            items.into_iter().map(|v| json_to_value(v, span)).collect(),
            span,
        ),
        serde_json::Value::Object(map) => {
            let mut record = Record::new();
            for (k, v) in map {
                record.push(k, json_to_value(v, span));
            }
            Value::record(record, span)
        }
    }
}

pub fn to_labeled(err: GalleryError, span: Span) -> LabeledError {
    let label = match &err {
        GalleryError::Config(_) | GalleryError::Json(_) => "invalid configuration",
        GalleryError::Selector(_) => "invalid markup selector",
        GalleryError::NotFound(_) | GalleryError::NotADirectory(_) => "bad path",
        GalleryError::Io { .. } => "I/O failure",
        GalleryError::OverrideFolderMissing(_) => "override table is stale",
    };
    LabeledError::new(err.to_string()).with_label(label, span)
}

/// Resolve `path` against the shell's working directory, not the plugin's.
pub fn resolve_path(engine: &EngineInterface, path: &Path) -> Result<PathBuf, LabeledError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = engine.get_current_dir()?;
    Ok(Path::new(&cwd).join(path))
}

/// Effective config for a command honouring its `--config` flag.
pub fn load_config(
    engine: &EngineInterface,
    call: &EvaluatedCall,
) -> Result<GalleryConfig, LabeledError> {
    let explicit = match call.get_flag::<String>("config")? {
        Some(p) => Some(resolve_path(engine, Path::new(&p))?),
        None => None,
    };
    config::resolve_config(explicit.as_deref()).map_err(|e| to_labeled(e, call.head))
}

/// `--site`, defaulting to the shell's working directory.
pub fn site_dir(engine: &EngineInterface, call: &EvaluatedCall) -> Result<PathBuf, LabeledError> {
    let site = call.get_flag::<String>("site")?.unwrap_or_else(|| ".".into());
    resolve_path(engine, Path::new(&site))
}

pub fn images_dir(
    engine: &EngineInterface,
    call: &EvaluatedCall,
) -> Result<Option<PathBuf>, LabeledError> {
    match call.get_flag::<String>("images")? {
        Some(p) => Ok(Some(resolve_path(engine, Path::new(&p))?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_become_records() {
        let span = Span::test_data();
        let v = json_to_value(json!({"page": "mugs.html", "count": 3, "score": 0.5, "folder": null}), span);
        let record = v.as_record().unwrap();
        assert_eq!(record.get("page").unwrap().as_str().unwrap(), "mugs.html");
        assert_eq!(record.get("count").unwrap().as_int().unwrap(), 3);
        assert_eq!(record.get("score").unwrap().as_float().unwrap(), 0.5);
        assert!(record.get("folder").unwrap().is_nothing());
    }

    #[test]
    fn arrays_become_lists() {
        let v = json_to_value(json!([{"a": 1}, {"a": 2}]), Span::test_data());
        assert_eq!(v.as_list().unwrap().len(), 2);
    }
}
