use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::domain::{PredictionStrategy, SiteSelection};
use super::encoder::CategoryOptions;
use super::engine::{PredictionBasis, PredictionEngine, PredictionError};
use super::scorer::{RiskLevel, RiskScorer};
use crate::resources::{ResourceLoadError, Resources};

/// Composes validation, prediction, and scoring over one loaded resource bundle.
#[derive(Debug, Clone)]
pub struct RiskAssessmentService {
    resources: Arc<Resources>,
    engine: PredictionEngine,
    scorer: RiskScorer,
}

impl RiskAssessmentService {
    pub fn new(
        resources: Arc<Resources>,
        strategy: PredictionStrategy,
        default_score: f64,
    ) -> Result<Self, ResourceLoadError> {
        let engine = PredictionEngine::for_strategy(strategy, &resources)?;
        let scorer = RiskScorer::new(Arc::clone(&resources.risk_table), default_score);

        Ok(Self {
            resources,
            engine,
            scorer,
        })
    }

    pub fn strategy(&self) -> PredictionStrategy {
        self.engine.strategy()
    }

    pub fn options(&self) -> CategoryOptions {
        self.resources.options()
    }

    /// Validate the selection, predict, and score. Aborts only this assessment on error.
    pub fn assess(&self, selection: SiteSelection) -> Result<RiskAssessment, PredictionError> {
        self.resources
            .injury_encoders
            .inputs
            .encode_selection(&selection)?;

        let prediction = self.engine.predict(&selection)?;
        let breakdown = self.scorer.score(
            &prediction.output.injury_type,
            &prediction.output.cause_material,
        );
        let risk_level = breakdown.level();

        info!(
            strategy = self.strategy().label(),
            injury_type = %prediction.output.injury_type,
            cause_material = %prediction.output.cause_material,
            final_risk = breakdown.final_risk,
            risk_level = risk_level.label(),
            "risk assessed"
        );

        Ok(RiskAssessment {
            strategy: self.strategy(),
            injury_level: breakdown.injury_level(),
            cause_level: breakdown.cause_level(),
            advice: risk_level.advice(),
            injury_type: prediction.output.injury_type,
            cause_material: prediction.output.cause_material,
            injury_risk: breakdown.injury_risk,
            cause_risk: breakdown.cause_risk,
            final_risk: breakdown.final_risk,
            risk_level,
            injury_risk_defaulted: breakdown.injury_defaulted,
            cause_risk_defaulted: breakdown.cause_defaulted,
            basis: prediction.basis,
            selection,
            assessed_at: Utc::now(),
        })
    }
}

/// Result of one assessment as exposed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub selection: SiteSelection,
    pub strategy: PredictionStrategy,
    pub injury_type: String,
    pub cause_material: String,
    pub injury_risk: f64,
    pub cause_risk: f64,
    pub final_risk: f64,
    pub injury_level: RiskLevel,
    pub cause_level: RiskLevel,
    pub risk_level: RiskLevel,
    pub advice: &'static str,
    pub injury_risk_defaulted: bool,
    pub cause_risk_defaulted: bool,
    pub basis: PredictionBasis,
    pub assessed_at: DateTime<Utc>,
}
