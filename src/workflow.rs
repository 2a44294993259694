use crate::cli::{MergeArgs, RunArgs, ValidateArgs};
use crate::discover::{discover_sources, SubstringClassifier};
use crate::merge;
use crate::report;
use crate::util::now_epoch_ms;
use crate::validate::{self, Severity, ValidationReport};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

pub fn run_merge(args: &MergeArgs) -> Result<()> {
    merge_to_outputs(
        &args.fields_dir,
        &args.out,
        args.analysis_report.as_deref(),
        args.orchestrator.as_deref(),
        args.quiet,
    )
}

pub fn run_validate(args: &ValidateArgs) -> Result<ValidationReport> {
    validate_to_outputs(&args.pool, &args.docs, args.out_report.as_deref())
}

pub fn run_pipeline(args: &RunArgs) -> Result<ValidationReport> {
    merge_to_outputs(
        &args.fields_dir,
        &args.out,
        args.analysis_report.as_deref(),
        args.orchestrator.as_deref(),
        args.quiet,
    )?;
    validate_to_outputs(&args.out, &args.docs, args.out_report.as_deref())
}

fn merge_to_outputs(
    fields_dir: &Path,
    out: &Path,
    analysis_report: Option<&Path>,
    orchestrator: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let classifier = SubstringClassifier::default();
    let sources = discover_sources(fields_dir, &classifier)?;
    if sources.is_empty() {
        return Err(anyhow!(
            "no field sources discovered in {}",
            fields_dir.display()
        ));
    }
    tracing::info!(count = sources.len(), "discovered field sources");

    let outcome = merge::merge(&sources);
    if outcome.pool.is_empty() {
        tracing::warn!("merge admitted no fields");
    }
    tracing::info!(fields = outcome.pool.len(), "merge complete");
    let (stats, analysis) = report::aggregate(&outcome);
    let orchestrator_config = orchestrator.and_then(load_orchestrator_config);
    let generated_at_epoch_ms = now_epoch_ms()?;

    let meta = report::meta_envelope(
        stats.clone(),
        analysis.clone(),
        orchestrator_config,
        generated_at_epoch_ms,
    );
    let meta_value = serde_yaml::to_value(&meta).context("serialize _meta")?;
    let document = outcome.pool.to_document(meta_value);
    let rendered = serde_yaml::to_string(&document).context("serialize pool document")?;
    write_text_atomic(out, &rendered)?;
    println!("wrote {}", out.display());

    if let Some(report_path) = analysis_report {
        let sidecar = report::AnalysisReport {
            generated_at_epoch_ms,
            statistics: &stats,
            business_analysis: &analysis,
            recommendations: &analysis.optimization_opportunities,
            diagnostics: &outcome.diagnostics,
        };
        write_json_atomic(report_path, &sidecar)?;
        println!("wrote {}", report_path.display());
    }

    if !quiet {
        report::print_summary(&stats, &analysis);
    }
    Ok(())
}

fn validate_to_outputs(
    pool: &Path,
    docs: &Path,
    out_report: Option<&Path>,
) -> Result<ValidationReport> {
    let report = validate::run_all(pool, docs, now_epoch_ms()?);
    if let Some(report_path) = out_report {
        write_json_atomic(report_path, &report)?;
        println!("wrote {}", report_path.display());
    }
    print_validation_summary(&report);
    Ok(report)
}

/// Unreadable or malformed orchestrator files degrade to a warning; a loaded
/// file without `global_config` contributes an empty mapping.
fn load_orchestrator_config(path: &Path) -> Option<Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "orchestrator file unreadable");
            return None;
        }
    };
    let document: Value = match serde_yaml::from_str(&content) {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "orchestrator file malformed");
            return None;
        }
    };
    Some(
        document
            .get("global_config")
            .cloned()
            .unwrap_or_else(|| Value::Mapping(serde_yaml::Mapping::new())),
    )
}

fn print_validation_summary(report: &ValidationReport) {
    println!(
        "validation complete: {} errors, {} warnings, {} passed",
        report.summary.errors, report.summary.warnings, report.summary.passed
    );
    for finding in &report.details {
        let label = match finding.status {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Pass => continue,
        };
        if finding.file_path.is_empty() {
            println!("  {label}: {}", finding.message);
        } else {
            println!("  {label}: {} ({})", finding.message, finding.file_path);
        }
    }
}

fn write_text_atomic(dest: &Path, text: &str) -> Result<()> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let file_name = dest
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("staged");
    let tmp_path = parent.join(format!(".{file_name}.tmp"));
    fs::write(&tmp_path, text).with_context(|| format!("write {}", dest.display()))?;
    fs::rename(&tmp_path, dest).with_context(|| format!("publish {}", dest.display()))?;
    Ok(())
}

fn write_json_atomic<T: Serialize>(dest: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize JSON report")?;
    write_text_atomic(dest, &json)
}
