mod classifier;
mod rules;

pub use classifier::{
    Classifier, InferenceError, ModelShapeError, ObliviousTree, ObliviousTreeEnsemble, TreeSplit,
};
pub use rules::{RuleBook, RuleMatch};

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::domain::{PredictionOutput, PredictionStrategy, SiteSelection, Target};
use super::encoder::{EncoderSet, EncodingError};
use crate::resources::{ArtifactKind, ResourceLoadError, Resources};
use classifier::reconcile_features;

#[cfg(test)]
pub(crate) use rules::table_sizes_for_tests;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Evidence behind a prediction, surfaced alongside the labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PredictionBasis {
    RuleBased {
        injury: RuleMatch,
        cause: RuleMatch,
    },
    ClassifierBased {
        injury_class: u32,
        cause_class: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub output: PredictionOutput,
    pub basis: PredictionBasis,
}

/// Prediction strategy chosen once at configuration time.
#[derive(Debug, Clone)]
pub enum PredictionEngine {
    RuleBased(RuleBook),
    ClassifierBased(ClassifierEngine),
}

impl PredictionEngine {
    pub fn for_strategy(
        strategy: PredictionStrategy,
        resources: &Arc<Resources>,
    ) -> Result<Self, ResourceLoadError> {
        match strategy {
            PredictionStrategy::RuleBased => Ok(Self::RuleBased(RuleBook)),
            PredictionStrategy::ClassifierBased => {
                ClassifierEngine::new(Arc::clone(resources)).map(Self::ClassifierBased)
            }
        }
    }

    pub fn strategy(&self) -> PredictionStrategy {
        match self {
            PredictionEngine::RuleBased(_) => PredictionStrategy::RuleBased,
            PredictionEngine::ClassifierBased(_) => PredictionStrategy::ClassifierBased,
        }
    }

    pub fn predict(&self, selection: &SiteSelection) -> Result<Prediction, PredictionError> {
        match self {
            PredictionEngine::RuleBased(rules) => {
                let (output, injury, cause) = rules.predict(selection);
                Ok(Prediction {
                    output,
                    basis: PredictionBasis::RuleBased { injury, cause },
                })
            }
            PredictionEngine::ClassifierBased(engine) => engine.predict(selection),
        }
    }
}

/// Runs the injury and cause classifiers, each against its own encoder artifact.
#[derive(Debug, Clone)]
pub struct ClassifierEngine {
    injury: Arc<dyn Classifier>,
    cause: Arc<dyn Classifier>,
    resources: Arc<Resources>,
}

impl ClassifierEngine {
    pub fn new(resources: Arc<Resources>) -> Result<Self, ResourceLoadError> {
        let Some(classifiers) = resources.classifiers.as_ref() else {
            return Err(ResourceLoadError::Invalid {
                artifact: ArtifactKind::InjuryClassifier,
                reason: "classifier strategy selected but no classifier artifacts were loaded"
                    .to_string(),
            });
        };

        Ok(Self {
            injury: Arc::clone(&classifiers.injury),
            cause: Arc::clone(&classifiers.cause),
            resources,
        })
    }

    pub fn predict(&self, selection: &SiteSelection) -> Result<Prediction, PredictionError> {
        let (injury_type, injury_class) = run_classifier(
            self.injury.as_ref(),
            &self.resources.injury_encoders,
            selection,
        )?;
        let (cause_material, cause_class) = run_classifier(
            self.cause.as_ref(),
            &self.resources.cause_encoders,
            selection,
        )?;

        debug!(
            injury_class,
            cause_class, %injury_type, %cause_material, "classifier prediction"
        );

        Ok(Prediction {
            output: PredictionOutput {
                injury_type,
                cause_material,
            },
            basis: PredictionBasis::ClassifierBased {
                injury_class,
                cause_class,
            },
        })
    }
}

fn run_classifier(
    classifier: &dyn Classifier,
    encoders: &EncoderSet,
    selection: &SiteSelection,
) -> Result<(String, u32), PredictionError> {
    let encoded = encoders.inputs.encode_selection(selection)?;
    let features = reconcile_features(classifier, &encoded)?;
    let code = classifier.predict(&features)?;
    let label = encoders
        .target
        .decode(code)
        .map_err(|_| unknown_class(encoders.target.target(), code))?;
    Ok((label.to_string(), code))
}

fn unknown_class(target: Target, code: u32) -> InferenceError {
    InferenceError::UnknownClass { target, code }
}
