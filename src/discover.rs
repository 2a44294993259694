//! Fragment source discovery.
//!
//! Discovery only enumerates and orders; it never reads file contents. Tier
//! assignment is delegated to a [`PriorityClassifier`] so the filename
//! heuristic can be swapped (for example, for an in-file tier declaration)
//! without touching the merge engine.

use crate::schema::PriorityTier;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File-name prefixes excluded from discovery.
pub const RESERVED_FILE_PREFIXES: &[&str] = &["CNTNT-", "_", "."];

const SOURCE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// One discovered fragment source, ready for loading.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub file_name: String,
    pub tier: PriorityTier,
}

/// Strategy assigning a priority tier to a source by its file name.
pub trait PriorityClassifier {
    fn classify(&self, file_name: &str) -> PriorityTier;
}

/// Default classifier: case-insensitive substring table per tier.
#[derive(Debug, Clone)]
pub struct SubstringClassifier {
    pub tier0: Vec<String>,
    pub tier1: Vec<String>,
    pub tier2: Vec<String>,
}

impl Default for SubstringClassifier {
    fn default() -> Self {
        let tokens = |items: &[&str]| items.iter().map(|item| item.to_string()).collect();
        SubstringClassifier {
            tier0: tokens(&["-p0.", "core", "mvp"]),
            tier1: tokens(&["-p1.", "arch", "platform"]),
            tier2: tokens(&["-p2.", "metrics", "quality"]),
        }
    }
}

impl PriorityClassifier for SubstringClassifier {
    fn classify(&self, file_name: &str) -> PriorityTier {
        let lower = file_name.to_lowercase();
        let matches = |tokens: &[String]| tokens.iter().any(|token| lower.contains(token.as_str()));
        if matches(&self.tier0) {
            PriorityTier::P0
        } else if matches(&self.tier1) {
            PriorityTier::P1
        } else if matches(&self.tier2) {
            PriorityTier::P2
        } else {
            PriorityTier::P3
        }
    }
}

/// Enumerate eligible sources under `fields_dir`, ordered by (tier, name).
///
/// The (tier, lexical name) order is the merge engine's traversal order and
/// must be reproducible across runs on an unchanged source set.
pub fn discover_sources(
    fields_dir: &Path,
    classifier: &dyn PriorityClassifier,
) -> Result<Vec<SourceFile>> {
    if !fields_dir.is_dir() {
        return Err(anyhow!(
            "fields directory not found: {}",
            fields_dir.display()
        ));
    }

    let mut sources = Vec::new();
    let entries =
        fs::read_dir(fields_dir).with_context(|| format!("read {}", fields_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read {}", fields_dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !has_source_extension(&path) || is_reserved_file_name(file_name) {
            continue;
        }
        sources.push(SourceFile {
            file_name: file_name.to_string(),
            tier: classifier.classify(file_name),
            path,
        });
    }

    sources.sort_by_key(|source| (source.tier.rank(), source.file_name.clone()));
    Ok(sources)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn is_reserved_file_name(file_name: &str) -> bool {
    RESERVED_FILE_PREFIXES
        .iter()
        .any(|prefix| file_name.starts_with(prefix))
}
