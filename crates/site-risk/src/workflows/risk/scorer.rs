use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

const HIGH_THRESHOLD: f64 = 30.0;
const MEDIUM_THRESHOLD: f64 = 15.0;

/// Historical risk percentages keyed by injury type and by cause material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskTable {
    injury: HashMap<String, f64>,
    cause: HashMap<String, f64>,
}

impl RiskTable {
    pub fn new(injury: HashMap<String, f64>, cause: HashMap<String, f64>) -> Self {
        Self { injury, cause }
    }

    pub fn injury_risk(&self, injury_type: &str) -> Option<f64> {
        self.injury.get(injury_type).copied()
    }

    pub fn cause_risk(&self, cause_material: &str) -> Option<f64> {
        self.cause.get(cause_material).copied()
    }

    pub fn injury_len(&self) -> usize {
        self.injury.len()
    }

    pub fn cause_len(&self) -> usize {
        self.cause.len()
    }
}

/// Display band for a risk percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn classify(score: f64) -> Self {
        if score > HIGH_THRESHOLD {
            RiskLevel::High
        } else if score > MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            RiskLevel::High => "Extreme caution required.",
            RiskLevel::Medium => "Appropriate safety measures are required.",
            RiskLevel::Low => "Relatively safe level.",
        }
    }
}

/// Component scores and their mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskBreakdown {
    pub injury_risk: f64,
    pub cause_risk: f64,
    pub final_risk: f64,
    pub injury_defaulted: bool,
    pub cause_defaulted: bool,
}

impl RiskBreakdown {
    pub fn level(&self) -> RiskLevel {
        RiskLevel::classify(self.final_risk)
    }

    pub fn injury_level(&self) -> RiskLevel {
        RiskLevel::classify(self.injury_risk)
    }

    pub fn cause_level(&self) -> RiskLevel {
        RiskLevel::classify(self.cause_risk)
    }
}

/// Averages the injury and cause lookups; a missing entry scores `default_score`.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    table: Arc<RiskTable>,
    default_score: f64,
}

impl RiskScorer {
    pub fn new(table: Arc<RiskTable>, default_score: f64) -> Self {
        Self {
            table,
            default_score,
        }
    }

    pub fn default_score(&self) -> f64 {
        self.default_score
    }

    pub fn score(&self, injury_type: &str, cause_material: &str) -> RiskBreakdown {
        let injury = self.table.injury_risk(injury_type);
        let cause = self.table.cause_risk(cause_material);

        if injury.is_none() {
            debug!(
                %injury_type,
                default = self.default_score,
                "injury type missing from risk table"
            );
        }
        if cause.is_none() {
            debug!(
                %cause_material,
                default = self.default_score,
                "cause material missing from risk table"
            );
        }

        let injury_risk = injury.unwrap_or(self.default_score);
        let cause_risk = cause.unwrap_or(self.default_score);

        RiskBreakdown {
            injury_risk,
            cause_risk,
            final_risk: (injury_risk + cause_risk) / 2.0,
            injury_defaulted: injury.is_none(),
            cause_defaulted: cause.is_none(),
        }
    }
}
