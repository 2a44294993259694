//! Fragment loading: one YAML source into candidate field records.
//!
//! A source is either a flat name-to-record mapping or a mapping with a `fields`
//! key holding that mapping; the nesting is unwrapped transparently, one level
//! only. Reserved top-level keys and underscore-prefixed names are never
//! candidates. Failures are per-source: the caller records a diagnostic and
//! moves on.

use serde_yaml::Value;
use std::fmt;
use std::fs;
use std::path::Path;

/// Top-level keys that are metadata, never field candidates.
pub const RESERVED_KEYS: &[&str] = &["version", "meta", "config", "fields"];

/// Per-source failure. Unreadable and malformed sources are distinguished so
/// diagnostics can name the right remedy.
#[derive(Debug)]
pub enum LoadError {
    Io(String),
    Parse(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(message) => write!(f, "unreadable source: {message}"),
            LoadError::Parse(message) => write!(f, "malformed source: {message}"),
        }
    }
}

/// Parse one source into `(name, body)` candidates in document order.
///
/// An empty document yields `None`; a mapping document yields its candidates
/// (possibly zero, if every key was reserved). A document whose root is not a
/// mapping is malformed.
pub fn load_source(path: &Path) -> Result<Option<Vec<(String, Value)>>, LoadError> {
    let content = fs::read_to_string(path).map_err(|err| LoadError::Io(err.to_string()))?;
    let document: Value =
        serde_yaml::from_str(&content).map_err(|err| LoadError::Parse(err.to_string()))?;

    let root = match document {
        Value::Null => return Ok(None),
        Value::Mapping(root) => root,
        _ => return Err(LoadError::Parse("document root is not a mapping".to_string())),
    };

    // One level of unwrapping only; a `fields` key inside `fields` is data.
    let field_entries = match root.get("fields").and_then(Value::as_mapping) {
        Some(nested) => nested.clone(),
        None => root,
    };

    let mut candidates = Vec::new();
    for (key, body) in field_entries {
        let Some(name) = key.as_str() else {
            tracing::warn!(source = %path.display(), "skipping non-string field key");
            continue;
        };
        if is_reserved_name(name) {
            continue;
        }
        candidates.push((name.to_string(), body));
    }
    Ok(Some(candidates))
}

fn is_reserved_name(name: &str) -> bool {
    name.starts_with('_') || RESERVED_KEYS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source_with(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("source.yaml");
        let mut file = fs::File::create(&path).expect("create source");
        file.write_all(content.as_bytes()).expect("write source");
        (dir, path)
    }

    #[test]
    fn loads_flat_mapping() {
        let (_dir, path) = source_with(
            r#"
FOO:
  description: first
BAR:
  description: second
"#,
        );
        let candidates = load_source(&path).expect("load").expect("mapping document");
        let names: Vec<&str> = candidates.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["FOO", "BAR"]);
    }

    #[test]
    fn unwraps_fields_key_one_level() {
        let (_dir, path) = source_with(
            r#"
version: 3
fields:
  FOO:
    description: nested
  fields:
    description: plain data at the inner level
"#,
        );
        let candidates = load_source(&path).expect("load").expect("mapping document");
        let names: Vec<&str> = candidates.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["FOO"]);
    }

    #[test]
    fn skips_reserved_and_underscore_names() {
        let (_dir, path) = source_with(
            r#"
version: 1
meta: {}
config: {}
_draft:
  description: hidden
FOO:
  description: kept
"#,
        );
        let candidates = load_source(&path).expect("load").expect("mapping document");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].0, "FOO");
    }

    #[test]
    fn empty_document_yields_no_candidates() {
        let (_dir, path) = source_with("");
        assert!(load_source(&path).expect("load").is_none());
    }

    #[test]
    fn non_mapping_root_is_malformed() {
        let (_dir, path) = source_with("- just\n- a\n- list\n");
        match load_source(&path).unwrap_err() {
            LoadError::Parse(message) => assert!(message.contains("not a mapping")),
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn broken_yaml_is_malformed() {
        let (_dir, path) = source_with("FOO: [unclosed\n");
        assert!(matches!(load_source(&path).unwrap_err(), LoadError::Parse(_)));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let missing = dir.path().join("absent.yaml");
        assert!(matches!(load_source(&missing).unwrap_err(), LoadError::Io(_)));
    }
}
