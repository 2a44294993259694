//! Post-merge validation of the pool document against a reference corpus.
//!
//! Five passes run over an immutable pool snapshot; all findings are
//! collected, no pass gates another, and nothing is ever mutated:
//! - **Structure**: required root sections and per-record required
//!   attributes.
//! - **Reference**: every `{{fields.NAME[.attr]*}}` placeholder in the corpus
//!   must resolve through the pool, nested attributes included.
//! - **Syntax**: field names match the naming convention (warning only).
//! - **Consistency**: fields nothing references are reported unused; this
//!   pass consumes the reference pass's collected set.
//! - **Scale**: an oversized pool document is advisory, never an error.

use crate::schema::REQUIRED_ATTRIBUTES;
use crate::util::display_path;
use regex::Regex;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Root sections the pool document must carry.
pub const REQUIRED_ROOT_SECTIONS: &[&str] = &["fields", "_meta"];

/// Advisory ceiling for the serialized pool.
pub const POOL_SIZE_WARN_BYTES: u64 = 1024 * 1024;

const NAME_CONVENTION: &str = r"^[A-Z][A-Z0-9_]*$";
const REFERENCE_PATTERN: &str = r"\{\{fields\.([A-Z][A-Z0-9_]*(?:\.[A-Za-z0-9_]+)*)\}\}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Structure,
    Reference,
    Syntax,
    Consistency,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Pass,
    Warning,
    Error,
}

/// One validation outcome. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub check: CheckKind,
    pub status: Severity,
    pub message: String,
    pub file_path: String,
    pub line_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// One `{{fields....}}` placeholder occurrence in the corpus.
#[derive(Debug, Clone)]
pub struct ReferenceOccurrence {
    pub path: String,
    pub file: String,
    pub line: u64,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_checks: usize,
    pub errors: usize,
    pub warnings: usize,
    pub passed: usize,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub generated_at_epoch_ms: u64,
    pub summary: Summary,
    pub details: Vec<Finding>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}

/// Run every pass and fold the findings into a report.
pub fn run_all(pool_path: &Path, docs_dir: &Path, generated_at_epoch_ms: u64) -> ValidationReport {
    let mut findings = Vec::new();

    let start = findings.len();
    let fields = structure_pass(pool_path, &mut findings);
    note_clean(
        &mut findings,
        start,
        CheckKind::Structure,
        "pool structure is valid",
        pool_path,
    );

    let start = findings.len();
    let references = extract_references(docs_dir, &mut findings);
    let used = reference_pass(&fields, &references, &mut findings);
    note_clean(
        &mut findings,
        start,
        CheckKind::Reference,
        "all references resolve",
        docs_dir,
    );

    let start = findings.len();
    syntax_pass(&fields, &mut findings);
    note_clean(
        &mut findings,
        start,
        CheckKind::Syntax,
        "all field names match the naming convention",
        pool_path,
    );

    let start = findings.len();
    consistency_pass(&fields, &used, &mut findings);
    note_clean(
        &mut findings,
        start,
        CheckKind::Consistency,
        "no unused fields",
        pool_path,
    );

    let start = findings.len();
    scale_pass(pool_path, &mut findings);
    note_clean(
        &mut findings,
        start,
        CheckKind::Scale,
        "pool size is within bounds",
        pool_path,
    );

    let summary = Summary {
        total_checks: findings.len(),
        errors: count(&findings, Severity::Error),
        warnings: count(&findings, Severity::Warning),
        passed: count(&findings, Severity::Pass),
    };
    ValidationReport {
        generated_at_epoch_ms,
        summary,
        details: findings,
    }
}

/// Parse the pool document and check its required shape.
///
/// Returns the `fields` mapping (empty when the document is unusable) so the
/// remaining passes can still run and report against it.
fn structure_pass(pool_path: &Path, findings: &mut Vec<Finding>) -> Mapping {
    let content = match fs::read_to_string(pool_path) {
        Ok(content) => content,
        Err(err) => {
            findings.push(error(
                CheckKind::Structure,
                format!("pool document unreadable: {err}"),
                pool_path.display().to_string(),
                0,
                Some("run a merge to produce the pool document".to_string()),
            ));
            return Mapping::new();
        }
    };
    let document: Value = match serde_yaml::from_str(&content) {
        Ok(document) => document,
        Err(err) => {
            findings.push(error(
                CheckKind::Structure,
                format!("pool document is not valid YAML: {err}"),
                pool_path.display().to_string(),
                0,
                Some("check the YAML syntax".to_string()),
            ));
            return Mapping::new();
        }
    };
    let Some(root) = document.as_mapping() else {
        findings.push(error(
            CheckKind::Structure,
            "pool document root is not a mapping".to_string(),
            pool_path.display().to_string(),
            0,
            None,
        ));
        return Mapping::new();
    };

    for section in REQUIRED_ROOT_SECTIONS {
        if root.get(*section).is_none() {
            findings.push(error(
                CheckKind::Structure,
                format!("missing required root section: {section}"),
                pool_path.display().to_string(),
                0,
                Some(format!("add a '{section}:' section to the document")),
            ));
        }
    }

    let fields = root
        .get("fields")
        .and_then(Value::as_mapping)
        .cloned()
        .unwrap_or_default();
    for (name, body) in &fields {
        let (Some(name), Some(body)) = (name.as_str(), body.as_mapping()) else {
            continue;
        };
        for attr in REQUIRED_ATTRIBUTES {
            if body.get(*attr).is_none() {
                findings.push(warning(
                    CheckKind::Structure,
                    format!("field {name} is missing attribute: {attr}"),
                    pool_path.display().to_string(),
                    0,
                    Some(format!("add the {attr} attribute to {name}")),
                ));
            }
        }
    }
    fields
}

/// Collect every placeholder occurrence under `docs_dir`, in deterministic
/// (file name, line) order.
fn extract_references(docs_dir: &Path, findings: &mut Vec<Finding>) -> Vec<ReferenceOccurrence> {
    let pattern = Regex::new(REFERENCE_PATTERN).expect("reference pattern");
    let mut occurrences = Vec::new();

    let walker = WalkDir::new(docs_dir).sort_by_file_name();
    for entry in walker.into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let shown = display_path(path, Some(docs_dir));
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                findings.push(error(
                    CheckKind::Reference,
                    format!("document unreadable: {err}"),
                    shown,
                    0,
                    None,
                ));
                continue;
            }
        };
        for (index, line) in content.lines().enumerate() {
            for capture in pattern.captures_iter(line) {
                occurrences.push(ReferenceOccurrence {
                    path: capture[1].to_string(),
                    file: shown.clone(),
                    line: index as u64 + 1,
                });
            }
        }
    }
    occurrences
}

/// Resolve every occurrence against the pool; return the set of referenced
/// field names for the consistency pass.
fn reference_pass(
    fields: &Mapping,
    references: &[ReferenceOccurrence],
    findings: &mut Vec<Finding>,
) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    for occurrence in references {
        let segments: Vec<&str> = occurrence.path.split('.').collect();
        let name = segments[0];
        // Any reference marks the field used, resolvable or not.
        used.insert(name.to_string());

        let Some(record) = fields.get(name) else {
            findings.push(error(
                CheckKind::Reference,
                format!("referenced field does not exist: {name}"),
                occurrence.file.clone(),
                occurrence.line,
                Some(format!(
                    "check the spelling or add {name} to the field pool"
                )),
            ));
            continue;
        };

        let mut current = record;
        for (depth, segment) in segments.iter().enumerate().skip(1) {
            match current.as_mapping().and_then(|mapping| mapping.get(*segment)) {
                Some(next) => current = next,
                None => {
                    findings.push(error(
                        CheckKind::Reference,
                        format!(
                            "reference path does not resolve: {}",
                            segments[..=depth].join(".")
                        ),
                        occurrence.file.clone(),
                        occurrence.line,
                        Some(format!("check the attribute structure of {name}")),
                    ));
                    break;
                }
            }
        }
    }
    used
}

fn syntax_pass(fields: &Mapping, findings: &mut Vec<Finding>) {
    let convention = Regex::new(NAME_CONVENTION).expect("naming convention pattern");
    for name in fields.keys().filter_map(Value::as_str) {
        if !convention.is_match(name) {
            findings.push(warning(
                CheckKind::Syntax,
                format!("field name does not match naming convention: {name}"),
                String::new(),
                0,
                Some("use uppercase letters, digits and underscores, e.g. FIELD_NAME".to_string()),
            ));
        }
    }
}

fn consistency_pass(fields: &Mapping, used: &BTreeSet<String>, findings: &mut Vec<Finding>) {
    for name in fields.keys().filter_map(Value::as_str) {
        if !used.contains(name) {
            findings.push(warning(
                CheckKind::Consistency,
                format!("unused field: {name}"),
                String::new(),
                0,
                Some("remove the field or add a reference to it".to_string()),
            ));
        }
    }
}

fn scale_pass(pool_path: &Path, findings: &mut Vec<Finding>) {
    let Ok(metadata) = fs::metadata(pool_path) else {
        return;
    };
    if metadata.len() > POOL_SIZE_WARN_BYTES {
        findings.push(warning(
            CheckKind::Scale,
            format!(
                "pool document is large: {:.2} MiB",
                metadata.len() as f64 / (1024.0 * 1024.0)
            ),
            pool_path.display().to_string(),
            0,
            Some("split the field pool or trim field definitions".to_string()),
        ));
    }
}

fn note_clean(
    findings: &mut Vec<Finding>,
    start: usize,
    check: CheckKind,
    message: &str,
    location: &Path,
) {
    if findings.len() == start {
        findings.push(Finding {
            check,
            status: Severity::Pass,
            message: message.to_string(),
            file_path: location.display().to_string(),
            line_number: 0,
            suggestion: None,
        });
    }
}

fn error(
    check: CheckKind,
    message: String,
    file_path: String,
    line_number: u64,
    suggestion: Option<String>,
) -> Finding {
    Finding {
        check,
        status: Severity::Error,
        message,
        file_path,
        line_number,
        suggestion,
    }
}

fn warning(
    check: CheckKind,
    message: String,
    file_path: String,
    line_number: u64,
    suggestion: Option<String>,
) -> Finding {
    Finding {
        check,
        status: Severity::Warning,
        message,
        file_path,
        line_number,
        suggestion,
    }
}

fn count(findings: &[Finding], status: Severity) -> usize {
    findings
        .iter()
        .filter(|finding| finding.status == status)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Fixture {
        _dir: tempfile::TempDir,
        pool_path: PathBuf,
        docs_dir: PathBuf,
    }

    fn fixture(pool_yaml: &str, docs: &[(&str, &str)]) -> Fixture {
        let dir = tempfile::tempdir().expect("create temp dir");
        let pool_path = dir.path().join("fields.yaml");
        fs::write(&pool_path, pool_yaml).expect("write pool");
        let docs_dir = dir.path().join("docs");
        fs::create_dir(&docs_dir).expect("create docs dir");
        for (name, content) in docs {
            fs::write(docs_dir.join(name), content).expect("write doc");
        }
        Fixture {
            _dir: dir,
            pool_path,
            docs_dir,
        }
    }

    const SIMPLE_POOL: &str = r#"
fields:
  FOO:
    zh-CN: x
    en-US: y
    description: z
    type: string
_meta:
  schema_version: 1
"#;

    fn run(fixture: &Fixture) -> ValidationReport {
        run_all(&fixture.pool_path, &fixture.docs_dir, 0)
    }

    #[test]
    fn clean_pool_passes_every_check() {
        let fixture = fixture(SIMPLE_POOL, &[("guide.md", "uses {{fields.FOO}} here\n")]);
        let report = run(&fixture);
        assert_eq!(report.summary.errors, 0);
        assert_eq!(report.summary.warnings, 0);
        assert_eq!(report.summary.passed, 5);
        assert!(!report.has_errors());
    }

    #[test]
    fn unresolvable_attribute_path_is_one_error_naming_the_path() {
        let fixture = fixture(SIMPLE_POOL, &[("guide.md", "see {{fields.FOO.bar}}\n")]);
        let report = run(&fixture);
        let reference_errors: Vec<&Finding> = report
            .details
            .iter()
            .filter(|f| f.check == CheckKind::Reference && f.status == Severity::Error)
            .collect();
        assert_eq!(reference_errors.len(), 1);
        assert!(reference_errors[0].message.contains("FOO.bar"));
        assert_eq!(reference_errors[0].line_number, 1);
    }

    #[test]
    fn reference_reports_longest_resolvable_prefix() {
        let pool = r#"
fields:
  FOO:
    zh-CN: x
    en-US: y
    description: z
    type: string
    limits:
      soft: 10
_meta: {}
"#;
        let fixture = fixture(pool, &[("guide.md", "{{fields.FOO.limits.hard.max}}\n")]);
        let report = run(&fixture);
        let message = &report
            .details
            .iter()
            .find(|f| f.check == CheckKind::Reference && f.status == Severity::Error)
            .expect("reference error")
            .message;
        assert!(message.contains("FOO.limits.hard"));
        assert!(!message.contains("hard.max"));
    }

    #[test]
    fn missing_field_reference_is_an_error() {
        let fixture = fixture(
            SIMPLE_POOL,
            &[("guide.md", "{{fields.FOO}} and {{fields.GONE}}\n")],
        );
        let report = run(&fixture);
        assert!(report.has_errors());
        assert!(report
            .details
            .iter()
            .any(|f| f.status == Severity::Error && f.message.contains("GONE")));
    }

    #[test]
    fn unused_field_is_exactly_one_warning() {
        let fixture = fixture(SIMPLE_POOL, &[("guide.md", "no references here\n")]);
        let report = run(&fixture);
        let unused: Vec<&Finding> = report
            .details
            .iter()
            .filter(|f| f.check == CheckKind::Consistency && f.status == Severity::Warning)
            .collect();
        assert_eq!(unused.len(), 1);
        assert!(unused[0].message.contains("FOO"));
        // Warnings never affect the error count.
        assert_eq!(report.summary.errors, 0);
    }

    #[test]
    fn referenced_but_unresolvable_field_is_not_reported_unused() {
        let fixture = fixture(SIMPLE_POOL, &[("guide.md", "{{fields.FOO.bar}}\n")]);
        let report = run(&fixture);
        assert!(!report
            .details
            .iter()
            .any(|f| f.check == CheckKind::Consistency && f.status == Severity::Warning));
    }

    #[test]
    fn lowercase_name_breaks_the_naming_convention() {
        let pool = r#"
fields:
  lower_case:
    zh-CN: x
    en-US: y
    description: z
    type: string
_meta: {}
"#;
        let fixture = fixture(pool, &[("guide.md", "{{fields.FOO}}\n")]);
        let report = run(&fixture);
        assert!(report
            .details
            .iter()
            .any(|f| f.check == CheckKind::Syntax
                && f.status == Severity::Warning
                && f.message.contains("lower_case")));
    }

    #[test]
    fn missing_root_section_is_an_error() {
        let pool = r#"
fields:
  FOO:
    zh-CN: x
    en-US: y
    description: z
    type: string
"#;
        let fixture = fixture(pool, &[]);
        let report = run(&fixture);
        assert!(report
            .details
            .iter()
            .any(|f| f.check == CheckKind::Structure
                && f.status == Severity::Error
                && f.message.contains("_meta")));
    }

    #[test]
    fn record_missing_attribute_is_a_structure_warning() {
        let pool = r#"
fields:
  FOO:
    zh-CN: x
    description: z
    type: string
_meta: {}
"#;
        let fixture = fixture(pool, &[("guide.md", "{{fields.FOO}}\n")]);
        let report = run(&fixture);
        assert!(report
            .details
            .iter()
            .any(|f| f.check == CheckKind::Structure
                && f.status == Severity::Warning
                && f.message.contains("en-US")));
        assert_eq!(report.summary.errors, 0);
    }

    #[test]
    fn unreadable_pool_still_reports_other_passes() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let pool_path = dir.path().join("absent.yaml");
        let docs_dir = dir.path().join("docs");
        fs::create_dir(&docs_dir).expect("create docs dir");
        fs::write(docs_dir.join("guide.md"), "{{fields.FOO}}\n").expect("write doc");

        let report = run_all(&pool_path, &docs_dir, 0);
        assert!(report.has_errors());
        // The reference resolves against an empty registry and fails too.
        assert!(report
            .details
            .iter()
            .any(|f| f.check == CheckKind::Reference && f.message.contains("FOO")));
    }
}
