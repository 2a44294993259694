//! Pool-level aggregation: statistics, business analysis, the `_meta`
//! envelope, and the analysis report.
//!
//! Everything here is derived from the completed pool plus the merge
//! counters; the merge engine itself carries no statistics.

use crate::analytics;
use crate::merge::{Diagnostic, MergeOutcome};
use crate::schema::{AiCollaborationLevel, PriorityTier, StartupPhase, ValueChainPosition};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

pub const META_SCHEMA_VERSION: u32 = 1;
pub const GENERATOR: &str = concat!("fpool v", env!("CARGO_PKG_VERSION"));

const HIGH_VALUE_SCORE: u8 = 8;
const RISK_AREA_SCORE: u8 = 7;
const TOKEN_BUDGET_ADVISORY: f64 = 50_000.0;
const MVP_RATIO_ADVISORY: f64 = 20.0;
const L0_RATIO_ADVISORY: f64 = 50.0;
const MITIGATION_COVERAGE_ADVISORY: f64 = 70.0;

#[derive(Debug, Clone, Serialize)]
pub struct MergeStats {
    pub total_fields: usize,
    pub by_priority: BTreeMap<String, usize>,
    pub by_ai_level: BTreeMap<String, usize>,
    pub by_startup_phase: BTreeMap<String, usize>,
    pub by_value_chain: BTreeMap<String, usize>,
    pub token_budget_total: f64,
    pub mvp_critical_fields: usize,
    pub quick_launch_compatible: usize,
    pub reusable_templates: usize,
    pub business_impact_high: usize,
    pub risk_mitigation_covered: usize,
    pub validation_errors: usize,
    pub files_processed: usize,
    pub files_failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BusinessAnalysis {
    pub high_value_fields: Vec<String>,
    pub mvp_critical_path: Vec<String>,
    pub risk_areas: Vec<String>,
    pub optimization_opportunities: Vec<String>,
}

/// The `_meta` section of the merged pool document.
#[derive(Debug, Serialize)]
pub struct MetaEnvelope {
    pub schema_version: u32,
    pub generated_at_epoch_ms: u64,
    pub generator: String,
    pub statistics: MergeStats,
    pub business_analysis: BusinessAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orchestrator_config: Option<Value>,
}

/// JSON sidecar next to the merged pool.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub generated_at_epoch_ms: u64,
    pub statistics: &'a MergeStats,
    pub business_analysis: &'a BusinessAnalysis,
    pub recommendations: &'a [String],
    pub diagnostics: &'a [Diagnostic],
}

/// Fold the completed merge into statistics and business analysis.
pub fn aggregate(outcome: &MergeOutcome) -> (MergeStats, BusinessAnalysis) {
    let mut stats = empty_stats(outcome);
    let mut analysis = BusinessAnalysis::default();

    for record in outcome.pool.iter() {
        stats.total_fields += 1;
        bump(&mut stats.by_priority, record.priority.as_str());
        // Unlevelled fields count as balanced collaboration.
        let level = record.ai_collaboration.unwrap_or(AiCollaborationLevel::L1);
        bump(&mut stats.by_ai_level, level.as_str());
        if let Some(phase) = record.startup_phase {
            bump(&mut stats.by_startup_phase, phase.as_str());
        }
        if let Some(position) = record.value_chain_position {
            bump(&mut stats.by_value_chain, position.as_str());
        }
        if let Some(tokens) = record
            .token_budget
            .as_ref()
            .and_then(|budget| budget.estimated_tokens)
        {
            stats.token_budget_total += tokens;
        }
        if let Some(relevance) = &record.mvp_relevance {
            if relevance.is_mvp_critical {
                stats.mvp_critical_fields += 1;
                analysis.mvp_critical_path.push(record.name.clone());
            }
            if relevance.quick_launch_compatible {
                stats.quick_launch_compatible += 1;
            }
        }
        if record
            .template_reusability
            .as_ref()
            .is_some_and(|reusability| reusability.is_reusable)
        {
            stats.reusable_templates += 1;
        }
        if record
            .risk_mitigation
            .as_ref()
            .is_some_and(|mitigation| mitigation.mitigation_strategy.is_some())
        {
            stats.risk_mitigation_covered += 1;
        }

        let value = analytics::score(record);
        if value.user_value_score >= HIGH_VALUE_SCORE
            || value.business_value_score >= HIGH_VALUE_SCORE
        {
            stats.business_impact_high += 1;
            analysis.high_value_fields.push(record.name.clone());
        }
        let risk = analytics::assess_risk(record);
        if risk.overall_risk_score >= RISK_AREA_SCORE {
            analysis.risk_areas.push(record.name.clone());
        }
    }

    analysis.optimization_opportunities = recommendations(&stats);
    (stats, analysis)
}

/// Deterministic advisory rules over the aggregated statistics.
pub fn recommendations(stats: &MergeStats) -> Vec<String> {
    let mut items = Vec::new();
    if stats.token_budget_total > TOKEN_BUDGET_ADVISORY {
        items.push("token budget total is high; consider trimming per-field budgets".to_string());
    }
    if percent(stats.mvp_critical_fields, stats.total_fields) < MVP_RATIO_ADVISORY {
        items.push(
            "MVP-critical coverage is low; consider raising the share of MVP-critical fields"
                .to_string(),
        );
    }
    let l0 = stats
        .by_ai_level
        .get(AiCollaborationLevel::L0.as_str())
        .copied()
        .unwrap_or(0);
    if percent(l0, stats.total_fields) < L0_RATIO_ADVISORY {
        items.push(
            "few fields are delegation-friendly (L0); consider raising the automation share"
                .to_string(),
        );
    }
    if percent(stats.risk_mitigation_covered, stats.total_fields) < MITIGATION_COVERAGE_ADVISORY {
        items.push(
            "risk mitigation coverage is incomplete; consider adding mitigation strategies"
                .to_string(),
        );
    }
    items
}

pub fn meta_envelope(
    stats: MergeStats,
    analysis: BusinessAnalysis,
    orchestrator_config: Option<Value>,
    generated_at_epoch_ms: u64,
) -> MetaEnvelope {
    MetaEnvelope {
        schema_version: META_SCHEMA_VERSION,
        generated_at_epoch_ms,
        generator: GENERATOR.to_string(),
        statistics: stats,
        business_analysis: analysis,
        orchestrator_config,
    }
}

/// Human-readable merge summary on stdout.
pub fn print_summary(stats: &MergeStats, analysis: &BusinessAnalysis) {
    println!("field pool merge summary");
    println!("  total fields: {}", stats.total_fields);
    println!(
        "  files: {} processed, {} failed",
        stats.files_processed, stats.files_failed
    );
    println!("  schema rejections: {}", stats.validation_errors);
    println!("  token budget total: {}", stats.token_budget_total);
    println!(
        "  mvp critical: {}; quick launch compatible: {}; reusable templates: {}",
        stats.mvp_critical_fields, stats.quick_launch_compatible, stats.reusable_templates
    );
    println!(
        "  high value fields: {}; risk mitigation covered: {}",
        stats.business_impact_high, stats.risk_mitigation_covered
    );

    println!("  by priority:");
    for tier in PriorityTier::ALL {
        let count = stats.by_priority.get(tier.as_str()).copied().unwrap_or(0);
        println!(
            "    {}: {} ({:.1}%)",
            tier.as_str(),
            count,
            percent(count, stats.total_fields)
        );
    }
    println!("  by collaboration level:");
    for level in AiCollaborationLevel::ALL {
        let count = stats.by_ai_level.get(level.as_str()).copied().unwrap_or(0);
        println!(
            "    {}: {} ({:.1}%) - {}",
            level.as_str(),
            count,
            percent(count, stats.total_fields),
            level.profile().use_case
        );
    }
    print_nonzero_map("by startup phase", &stats.by_startup_phase, stats.total_fields);
    print_nonzero_map("by value chain", &stats.by_value_chain, stats.total_fields);

    if !analysis.optimization_opportunities.is_empty() {
        println!("  recommendations:");
        for (index, item) in analysis.optimization_opportunities.iter().enumerate() {
            println!("    {}. {item}", index + 1);
        }
    }
}

fn print_nonzero_map(label: &str, map: &BTreeMap<String, usize>, total: usize) {
    if map.values().all(|&count| count == 0) {
        return;
    }
    println!("  {label}:");
    for (key, &count) in map {
        if count > 0 {
            println!("    {key}: {count} ({:.1}%)", percent(count, total));
        }
    }
}

fn empty_stats(outcome: &MergeOutcome) -> MergeStats {
    MergeStats {
        total_fields: 0,
        by_priority: seeded(PriorityTier::ALL.iter().map(|t| t.as_str())),
        by_ai_level: seeded(AiCollaborationLevel::ALL.iter().map(|l| l.as_str())),
        by_startup_phase: seeded(StartupPhase::ALL.iter().map(|p| p.as_str())),
        by_value_chain: seeded(ValueChainPosition::ALL.iter().map(|p| p.as_str())),
        token_budget_total: 0.0,
        mvp_critical_fields: 0,
        quick_launch_compatible: 0,
        reusable_templates: 0,
        business_impact_high: 0,
        risk_mitigation_covered: 0,
        validation_errors: outcome.rejected_records,
        files_processed: outcome.files_processed,
        files_failed: outcome.files_failed,
    }
}

fn seeded<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    keys.map(|key| (key.to_string(), 0)).collect()
}

fn bump(map: &mut BTreeMap<String, usize>, key: &str) {
    *map.entry(key.to_string()).or_insert(0) += 1;
}

fn percent(count: usize, total: usize) -> f64 {
    (count as f64 / total.max(1) as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergeOutcome;
    use crate::schema::validate_record;

    fn outcome_with(records: &[(&str, &str)]) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for (name, yaml) in records {
            let body: Value = serde_yaml::from_str(yaml).expect("parse test body");
            let record = validate_record(name, &body, "test.yaml").expect("valid record");
            outcome.pool.insert(record);
        }
        outcome
    }

    #[test]
    fn aggregates_counters_from_the_final_pool() {
        let outcome = outcome_with(&[
            (
                "CORE_BUDGET",
                r#"
zh-CN: x
en-US: y
description: z
type: token-budget
priority: P0
ai_collaboration: L0
startup_phase: launch
value_chain_position: business_value
token_budget:
  estimated_tokens: 1500
mvp_relevance:
  is_mvp_critical: true
  quick_launch_compatible: true
template_reusability:
  is_reusable: true
risk_mitigation:
  technical_risks: [a, b, c]
  market_risks: [a, b, c]
  execution_risks: [a]
  mitigation_strategy: contain it
"#,
            ),
            (
                "SIDE_NOTE",
                r#"
zh-CN: x
en-US: y
description: z
type: string
priority: P3
"#,
            ),
        ]);

        let (stats, analysis) = aggregate(&outcome);
        assert_eq!(stats.total_fields, 2);
        assert_eq!(stats.by_priority["P0"], 1);
        assert_eq!(stats.by_priority["P3"], 1);
        assert_eq!(stats.by_ai_level["L0"], 1);
        // SIDE_NOTE has no level tag and lands in L1.
        assert_eq!(stats.by_ai_level["L1"], 1);
        assert_eq!(stats.by_startup_phase["launch"], 1);
        assert_eq!(stats.by_value_chain["business_value"], 1);
        assert_eq!(stats.token_budget_total, 1500.0);
        assert_eq!(stats.mvp_critical_fields, 1);
        assert_eq!(stats.quick_launch_compatible, 1);
        assert_eq!(stats.reusable_templates, 1);
        assert_eq!(stats.risk_mitigation_covered, 1);
        assert_eq!(stats.business_impact_high, 1);
        assert_eq!(analysis.high_value_fields, vec!["CORE_BUDGET"]);
        assert_eq!(analysis.mvp_critical_path, vec!["CORE_BUDGET"]);
        // High + High + Medium = 8, past the risk-area threshold.
        assert_eq!(analysis.risk_areas, vec!["CORE_BUDGET"]);
    }

    #[test]
    fn recommendations_fire_on_thresholds() {
        let outcome = outcome_with(&[(
            "ONLY",
            r#"
zh-CN: x
en-US: y
description: z
type: string
priority: P3
"#,
        )]);
        let (stats, _) = aggregate(&outcome);
        let items = recommendations(&stats);
        // No MVP coverage, no L0 fields, no mitigation strategies.
        assert_eq!(items.len(), 3);
        assert!(items.iter().any(|i| i.contains("MVP-critical")));
        assert!(items.iter().any(|i| i.contains("delegation-friendly")));
        assert!(items.iter().any(|i| i.contains("risk mitigation")));
    }

    #[test]
    fn token_budget_advisory_requires_a_large_total() {
        let outcome = outcome_with(&[(
            "BIG",
            r#"
zh-CN: x
en-US: y
description: z
type: token-budget
token_budget:
  estimated_tokens: 60000
"#,
        )]);
        let (stats, _) = aggregate(&outcome);
        assert!(recommendations(&stats)
            .iter()
            .any(|i| i.contains("token budget total is high")));
    }
}
