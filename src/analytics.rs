//! Per-field value and risk scoring.
//!
//! Pure functions of a record; they read the pool and never touch it. Both
//! may run in any order once the merge completes.

use crate::schema::{FieldRecord, PriorityTier};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ValueScore {
    pub user_value_score: u8,
    pub business_value_score: u8,
    pub roi_potential: String,
    pub market_validation_status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn rank(&self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub technical_risk_level: RiskLevel,
    pub market_risk_level: RiskLevel,
    pub execution_risk_level: RiskLevel,
    pub overall_risk_score: u8,
}

const SCORE_CAP: u8 = 10;

/// Score a field's user and business value.
///
/// Base score follows the tier; MVP criticality and quick-launch
/// compatibility add fixed bonuses; both scores are capped at 10.
pub fn score(record: &FieldRecord) -> ValueScore {
    let mut base = match record.priority {
        PriorityTier::P0 => 10u8,
        PriorityTier::P1 => 7,
        PriorityTier::P2 => 5,
        PriorityTier::P3 => 3,
    };
    if let Some(relevance) = &record.mvp_relevance {
        if relevance.is_mvp_critical {
            base = base.saturating_add(5);
        }
        if relevance.quick_launch_compatible {
            base = base.saturating_add(3);
        }
    }
    let capped = base.min(SCORE_CAP);

    let impact = record.business_impact.as_ref();
    ValueScore {
        user_value_score: capped,
        business_value_score: capped,
        roi_potential: impact
            .and_then(|impact| impact.roi_estimate.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        market_validation_status: impact
            .and_then(|impact| impact.market_validation.clone())
            .unwrap_or_else(|| "pending".to_string()),
    }
}

/// Assess a field's risk from its mitigation lists.
///
/// Each dimension is bucketed by list length; the overall score is the sum
/// of the three bucket ranks, so it ranges 3..=9.
pub fn assess_risk(record: &FieldRecord) -> RiskAssessment {
    let (technical, market, execution) = match &record.risk_mitigation {
        Some(mitigation) => (
            bucket(mitigation.technical_risks.len()),
            bucket(mitigation.market_risks.len()),
            bucket(mitigation.execution_risks.len()),
        ),
        None => (RiskLevel::Low, RiskLevel::Low, RiskLevel::Low),
    };
    RiskAssessment {
        technical_risk_level: technical,
        market_risk_level: market,
        execution_risk_level: execution,
        overall_risk_score: technical.rank() + market.rank() + execution.rank(),
    }
}

fn bucket(count: usize) -> RiskLevel {
    match count {
        0 => RiskLevel::Low,
        1 | 2 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}
