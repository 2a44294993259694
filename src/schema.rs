//! Schema types for field records and the per-candidate admission gate.
//!
//! A candidate arrives as a raw YAML mapping. The gate checks every rule
//! independently and reports all violations at once; only a clean candidate
//! becomes a typed [`FieldRecord`]. The raw mapping is retained on the record
//! so the merged pool serializes exactly what the winning source authored and
//! dotted reference paths can resolve through nested attributes.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Locales every record must carry as top-level label keys.
pub const REQUIRED_LOCALES: &[&str] = &["zh-CN", "en-US"];

/// Attributes every record must carry.
pub const REQUIRED_ATTRIBUTES: &[&str] = &["zh-CN", "en-US", "description", "type"];

/// Priority tier governing conflict resolution. Lower rank wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityTier {
    P0,
    P1,
    P2,
    P3,
}

impl PriorityTier {
    pub const ALL: &'static [PriorityTier] = &[
        PriorityTier::P0,
        PriorityTier::P1,
        PriorityTier::P2,
        PriorityTier::P3,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "P0" => Some(PriorityTier::P0),
            "P1" => Some(PriorityTier::P1),
            "P2" => Some(PriorityTier::P2),
            "P3" => Some(PriorityTier::P3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::P0 => "P0",
            PriorityTier::P1 => "P1",
            PriorityTier::P2 => "P2",
            PriorityTier::P3 => "P3",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            PriorityTier::P0 => 0,
            PriorityTier::P1 => 1,
            PriorityTier::P2 => 2,
            PriorityTier::P3 => 3,
        }
    }
}

/// Fixed collaboration split attached to a level tag.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CollaborationProfile {
    pub ai_ratio: u8,
    pub human_ratio: u8,
    pub use_case: &'static str,
}

/// How much of the field's lifecycle is delegated to automation.
/// Informational only; never affects merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiCollaborationLevel {
    L0,
    L1,
    L2,
}

impl AiCollaborationLevel {
    pub const ALL: &'static [AiCollaborationLevel] = &[
        AiCollaborationLevel::L0,
        AiCollaborationLevel::L1,
        AiCollaborationLevel::L2,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "L0" => Some(AiCollaborationLevel::L0),
            "L1" => Some(AiCollaborationLevel::L1),
            "L2" => Some(AiCollaborationLevel::L2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AiCollaborationLevel::L0 => "L0",
            AiCollaborationLevel::L1 => "L1",
            AiCollaborationLevel::L2 => "L2",
        }
    }

    pub fn profile(&self) -> CollaborationProfile {
        match self {
            AiCollaborationLevel::L0 => CollaborationProfile {
                ai_ratio: 90,
                human_ratio: 10,
                use_case: "docs, code, tests",
            },
            AiCollaborationLevel::L1 => CollaborationProfile {
                ai_ratio: 50,
                human_ratio: 50,
                use_case: "architecture and product decisions",
            },
            AiCollaborationLevel::L2 => CollaborationProfile {
                ai_ratio: 30,
                human_ratio: 70,
                use_case: "strategy and business decisions",
            },
        }
    }
}

/// Lifecycle phase a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupPhase {
    Discovery,
    Validation,
    Development,
    Launch,
    Fundraising,
}

impl StartupPhase {
    pub const ALL: &'static [StartupPhase] = &[
        StartupPhase::Discovery,
        StartupPhase::Validation,
        StartupPhase::Development,
        StartupPhase::Launch,
        StartupPhase::Fundraising,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "discovery" => Some(StartupPhase::Discovery),
            "validation" => Some(StartupPhase::Validation),
            "development" => Some(StartupPhase::Development),
            "launch" => Some(StartupPhase::Launch),
            "fundraising" => Some(StartupPhase::Fundraising),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StartupPhase::Discovery => "discovery",
            StartupPhase::Validation => "validation",
            StartupPhase::Development => "development",
            StartupPhase::Launch => "launch",
            StartupPhase::Fundraising => "fundraising",
        }
    }
}

/// Where the field sits on the chain from user pain point to delivered
/// business value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueChainPosition {
    UserPainPoint,
    SolutionDesign,
    BusinessValue,
}

impl ValueChainPosition {
    pub const ALL: &'static [ValueChainPosition] = &[
        ValueChainPosition::UserPainPoint,
        ValueChainPosition::SolutionDesign,
        ValueChainPosition::BusinessValue,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "user_pain_point" => Some(ValueChainPosition::UserPainPoint),
            "solution_design" => Some(ValueChainPosition::SolutionDesign),
            "business_value" => Some(ValueChainPosition::BusinessValue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueChainPosition::UserPainPoint => "user_pain_point",
            ValueChainPosition::SolutionDesign => "solution_design",
            ValueChainPosition::BusinessValue => "business_value",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenBudget {
    pub estimated_tokens: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MvpRelevance {
    pub is_mvp_critical: bool,
    pub quick_launch_compatible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RiskMitigation {
    pub technical_risks: Vec<String>,
    pub market_risks: Vec<String>,
    pub execution_risks: Vec<String>,
    pub mitigation_strategy: Option<String>,
}

// Reuse contexts and template ids stay in the raw body; only the flag is
// consumed downstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateReusability {
    pub is_reusable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BusinessImpact {
    pub roi_estimate: Option<String>,
    pub market_validation: Option<String>,
}

/// One admitted configuration entry.
///
/// Typed fields are extracted views; `body` is the full attribute mapping as
/// authored by the winning source.
#[derive(Debug, Clone)]
pub struct FieldRecord {
    pub name: String,
    pub priority: PriorityTier,
    pub ai_collaboration: Option<AiCollaborationLevel>,
    pub startup_phase: Option<StartupPhase>,
    pub value_chain_position: Option<ValueChainPosition>,
    pub token_budget: Option<TokenBudget>,
    pub mvp_relevance: Option<MvpRelevance>,
    pub risk_mitigation: Option<RiskMitigation>,
    pub template_reusability: Option<TemplateReusability>,
    pub business_impact: Option<BusinessImpact>,
    pub origin: String,
    pub body: Mapping,
}

/// Check a candidate against every schema rule and produce the typed record.
///
/// All rules run; the error list names every violation, and any violation
/// rejects the whole candidate.
pub fn validate_record(name: &str, body: &Value, origin: &str) -> Result<FieldRecord, Vec<String>> {
    let Some(mapping) = body.as_mapping() else {
        return Err(vec!["record body must be a mapping".to_string()]);
    };

    let mut errors = Vec::new();

    for locale in REQUIRED_LOCALES {
        if mapping.get(*locale).is_none() {
            errors.push(format!("missing required locale label: {locale}"));
        }
    }
    for attr in REQUIRED_ATTRIBUTES
        .iter()
        .copied()
        .filter(|attr| !REQUIRED_LOCALES.contains(attr))
    {
        if mapping.get(attr).is_none() {
            errors.push(format!("missing required attribute: {attr}"));
        }
    }
    if let Some(description) = mapping.get("description") {
        if description.as_str().is_none_or(|text| text.trim().is_empty()) {
            errors.push("description must be a non-empty string".to_string());
        }
    }

    let priority = parse_enum_attr(mapping, "priority", PriorityTier::parse, &mut errors)
        .unwrap_or(PriorityTier::P3);
    let ai_collaboration = parse_enum_attr(
        mapping,
        "ai_collaboration",
        AiCollaborationLevel::parse,
        &mut errors,
    );
    let startup_phase = parse_enum_attr(mapping, "startup_phase", StartupPhase::parse, &mut errors);
    let value_chain_position = parse_enum_attr(
        mapping,
        "value_chain_position",
        ValueChainPosition::parse,
        &mut errors,
    );

    let token_budget = mapping
        .get("token_budget")
        .and_then(Value::as_mapping)
        .map(|budget| {
            let estimated_tokens = budget.get("estimated_tokens").and_then(|value| {
                let tokens = as_number(value);
                if tokens.is_none() {
                    errors.push("token_budget.estimated_tokens must be numeric".to_string());
                }
                tokens
            });
            TokenBudget { estimated_tokens }
        });

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(FieldRecord {
        name: name.to_string(),
        priority,
        ai_collaboration,
        startup_phase,
        value_chain_position,
        token_budget,
        mvp_relevance: extract_mvp_relevance(mapping),
        risk_mitigation: extract_risk_mitigation(mapping),
        template_reusability: extract_template_reusability(mapping),
        business_impact: extract_business_impact(mapping),
        origin: origin.to_string(),
        body: mapping.clone(),
    })
}

fn parse_enum_attr<T>(
    mapping: &Mapping,
    attr: &str,
    parse: fn(&str) -> Option<T>,
    errors: &mut Vec<String>,
) -> Option<T> {
    let value = mapping.get(attr)?;
    let parsed = value.as_str().and_then(parse);
    if parsed.is_none() {
        errors.push(format!("invalid {attr}: {}", scalar_to_string(value)));
    }
    parsed
}

fn extract_mvp_relevance(mapping: &Mapping) -> Option<MvpRelevance> {
    let relevance = mapping.get("mvp_relevance")?.as_mapping()?;
    Some(MvpRelevance {
        is_mvp_critical: get_bool(relevance, "is_mvp_critical"),
        quick_launch_compatible: get_bool(relevance, "quick_launch_compatible"),
    })
}

fn extract_risk_mitigation(mapping: &Mapping) -> Option<RiskMitigation> {
    let mitigation = mapping.get("risk_mitigation")?.as_mapping()?;
    Some(RiskMitigation {
        technical_risks: get_string_list(mitigation, "technical_risks"),
        market_risks: get_string_list(mitigation, "market_risks"),
        execution_risks: get_string_list(mitigation, "execution_risks"),
        mitigation_strategy: get_string(mitigation, "mitigation_strategy"),
    })
}

fn extract_template_reusability(mapping: &Mapping) -> Option<TemplateReusability> {
    let reusability = mapping.get("template_reusability")?.as_mapping()?;
    Some(TemplateReusability {
        is_reusable: get_bool(reusability, "is_reusable"),
    })
}

fn extract_business_impact(mapping: &Mapping) -> Option<BusinessImpact> {
    let impact = mapping.get("business_impact")?.as_mapping()?;
    Some(BusinessImpact {
        roi_estimate: get_string(impact, "roi_estimate"),
        market_validation: get_string(impact, "market_validation"),
    })
}

fn get_bool(mapping: &Mapping, key: &str) -> bool {
    mapping.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn get_string(mapping: &Mapping, key: &str) -> Option<String> {
    mapping
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn get_string_list(mapping: &Mapping, key: &str) -> Vec<String> {
    match mapping.get(key).and_then(Value::as_sequence) {
        Some(items) => items.iter().map(scalar_to_string).collect(),
        None => Vec::new(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|rendered| rendered.trim_end().to_string())
            .unwrap_or_default(),
    }
}
