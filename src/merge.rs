//! The merge engine: candidates from every source, one pool, one winner per
//! name.
//!
//! Sources are loaded concurrently (loading is independent per source), but
//! candidates are applied by a single ordered reduction in the discoverer's
//! (tier, name) order, never completion order, so tie-breaks are
//! reproducible. A candidate replaces an existing record iff its tier rank is
//! numerically <= the holder's: the last equal-priority contributor in
//! traversal order wins, and a later lower-priority contributor never
//! overrides an earlier higher-priority one.

use crate::discover::SourceFile;
use crate::loader::{self, LoadError};
use crate::pool::FieldPool;
use crate::schema::{self, PriorityTier};
use serde::Serialize;
use serde_yaml::Value;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    SourceUnreadable,
    SourceMalformed,
    EmptySource,
    SchemaViolation,
    Admitted,
    Overridden,
    Retained,
}

/// One merge event. The sequence is ordered and sufficient to reconstruct,
/// for any name, which source won and why.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl Diagnostic {
    fn source_level(kind: DiagnosticKind, source: &SourceFile, message: String) -> Self {
        Diagnostic {
            kind,
            source: source.file_name.clone(),
            field: None,
            message,
        }
    }

    fn field_level(
        kind: DiagnosticKind,
        source: &SourceFile,
        field: &str,
        message: String,
    ) -> Self {
        Diagnostic {
            kind,
            source: source.file_name.clone(),
            field: Some(field.to_string()),
            message,
        }
    }
}

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub pool: FieldPool,
    pub diagnostics: Vec<Diagnostic>,
    pub files_processed: usize,
    pub files_failed: usize,
    pub rejected_records: usize,
}

/// Merge all sources into one pool.
///
/// Source-level failures degrade to a diagnostic and a skip; the merge always
/// produces the best-effort pool from the remaining sources.
pub fn merge(sources: &[SourceFile]) -> MergeOutcome {
    let loads = load_all(sources);

    let mut outcome = MergeOutcome::default();
    for (source, load) in sources.iter().zip(loads) {
        tracing::info!(source = %source.file_name, tier = source.tier.as_str(), "merging source");
        let candidates = match load {
            Ok(Some(candidates)) => candidates,
            Ok(None) => {
                tracing::warn!(source = %source.file_name, "empty source");
                outcome.diagnostics.push(Diagnostic::source_level(
                    DiagnosticKind::EmptySource,
                    source,
                    "no field candidates".to_string(),
                ));
                continue;
            }
            Err(err) => {
                tracing::warn!(source = %source.file_name, error = %err, "skipping source");
                let kind = match err {
                    LoadError::Io(_) => DiagnosticKind::SourceUnreadable,
                    LoadError::Parse(_) => DiagnosticKind::SourceMalformed,
                };
                outcome
                    .diagnostics
                    .push(Diagnostic::source_level(kind, source, err.to_string()));
                outcome.files_failed += 1;
                continue;
            }
        };

        outcome.files_processed += 1;
        for (name, body) in candidates {
            apply_candidate(&mut outcome, source, &name, &body);
        }
    }
    outcome
}

fn apply_candidate(outcome: &mut MergeOutcome, source: &SourceFile, name: &str, body: &Value) {
    let record = match schema::validate_record(name, body, &source.file_name) {
        Ok(record) => record,
        Err(errors) => {
            tracing::warn!(source = %source.file_name, field = name, "rejecting candidate");
            outcome.diagnostics.push(Diagnostic::field_level(
                DiagnosticKind::SchemaViolation,
                source,
                name,
                errors.join("; "),
            ));
            outcome.rejected_records += 1;
            return;
        }
    };

    let existing = outcome
        .pool
        .get(name)
        .map(|held| (held.priority, held.origin.clone()));
    match existing {
        None => {
            outcome.diagnostics.push(Diagnostic::field_level(
                DiagnosticKind::Admitted,
                source,
                name,
                format!("admitted at {}", record.priority.as_str()),
            ));
            outcome.pool.insert(record);
        }
        Some((held_tier, held_origin)) => {
            if takes_precedence(record.priority, held_tier) {
                outcome.diagnostics.push(Diagnostic::field_level(
                    DiagnosticKind::Overridden,
                    source,
                    name,
                    format!(
                        "{} contributor replaces {} record from {}",
                        record.priority.as_str(),
                        held_tier.as_str(),
                        held_origin
                    ),
                ));
                outcome.pool.replace(record);
            } else {
                outcome.diagnostics.push(Diagnostic::field_level(
                    DiagnosticKind::Retained,
                    source,
                    name,
                    format!(
                        "kept {} record from {}; {} contributor does not take precedence",
                        held_tier.as_str(),
                        held_origin,
                        record.priority.as_str()
                    ),
                ));
            }
        }
    }
}

/// Equal-or-higher precedence wins, so same-tier contributors refine each
/// other in traversal order while higher tiers stay protected.
fn takes_precedence(candidate: PriorityTier, held: PriorityTier) -> bool {
    candidate.rank() <= held.rank()
}

type LoadResult = Result<Option<Vec<(String, Value)>>, LoadError>;

/// Load every source concurrently, returning results in source order.
fn load_all(sources: &[SourceFile]) -> Vec<LoadResult> {
    thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| scope.spawn(move || loader::load_source(&source.path)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(LoadError::Io("loader thread panicked".to_string())))
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::{discover_sources, SubstringClassifier};
    use std::fs;
    use std::path::Path;

    fn write_source(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).expect("write source");
    }

    fn merge_dir(dir: &Path) -> MergeOutcome {
        let sources =
            discover_sources(dir, &SubstringClassifier::default()).expect("discover sources");
        merge(&sources)
    }

    fn record_body(description: &str, priority: &str) -> String {
        format!(
            r#"
FOO:
  zh-CN: x
  en-US: y
  description: {description}
  type: string
  priority: {priority}
"#
        )
    }

    #[test]
    fn lower_tier_source_never_overrides_higher() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_source(dir.path(), "core.yaml", &record_body("from core", "P0"));
        write_source(dir.path(), "extra.yaml", &record_body("from extra", "P1"));

        let outcome = merge_dir(dir.path());
        let foo = outcome.pool.get("FOO").expect("FOO present");
        assert_eq!(foo.origin, "core.yaml");
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Retained && d.source == "extra.yaml"));
    }

    #[test]
    fn higher_tier_contributor_wins_even_when_processed_later() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_source(dir.path(), "alpha.yaml", &record_body("first", "P1"));
        write_source(dir.path(), "beta.yaml", &record_body("second", "P0"));

        let outcome = merge_dir(dir.path());
        let foo = outcome.pool.get("FOO").expect("FOO present");
        assert_eq!(foo.origin, "beta.yaml");
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Overridden && d.source == "beta.yaml"));
    }

    #[test]
    fn same_tier_later_source_wins_by_lexical_tie_break() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_source(dir.path(), "metrics-a.yaml", &record_body("earlier", "P2"));
        write_source(dir.path(), "metrics-b.yaml", &record_body("later", "P2"));

        let outcome = merge_dir(dir.path());
        let foo = outcome.pool.get("FOO").expect("FOO present");
        assert_eq!(foo.origin, "metrics-b.yaml");
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Overridden && d.source == "metrics-b.yaml"));
    }

    #[test]
    fn schema_violation_rejects_record_with_one_diagnostic() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_source(
            dir.path(),
            "broken.yaml",
            r#"
FOO:
  zh-CN: x
  en-US: y
  type: string
"#,
        );

        let outcome = merge_dir(dir.path());
        assert!(outcome.pool.get("FOO").is_none());
        let rejections: Vec<_> = outcome
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::SchemaViolation)
            .collect();
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].field.as_deref(), Some("FOO"));
        assert!(rejections[0].message.contains("description"));
        assert_eq!(outcome.rejected_records, 1);
    }

    #[test]
    fn malformed_source_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("create temp dir");
        for (name, description) in [
            ("a.yaml", "one"),
            ("b.yaml", "two"),
            ("c.yaml", "three"),
            ("d.yaml", "four"),
        ] {
            write_source(
                dir.path(),
                name,
                &format!(
                    r#"
{}:
  zh-CN: x
  en-US: y
  description: {description}
  type: string
"#,
                    name.trim_end_matches(".yaml").to_uppercase()
                ),
            );
        }
        write_source(dir.path(), "bad.yaml", "FOO: [unclosed\n");

        let outcome = merge_dir(dir.path());
        assert_eq!(outcome.pool.len(), 4);
        assert_eq!(outcome.files_processed, 4);
        assert_eq!(outcome.files_failed, 1);
        let parse_failures: Vec<_> = outcome
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::SourceMalformed)
            .collect();
        assert_eq!(parse_failures.len(), 1);
        assert_eq!(parse_failures[0].source, "bad.yaml");
    }

    #[test]
    fn empty_source_is_diagnosed() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_source(dir.path(), "empty.yaml", "");
        let outcome = merge_dir(dir.path());
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::EmptySource));
        assert_eq!(outcome.files_processed, 0);
        assert_eq!(outcome.files_failed, 0);
    }
}
