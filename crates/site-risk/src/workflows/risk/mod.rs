//! Fatality risk assessment: category encoding, prediction strategies, and risk scoring.

pub mod domain;
pub mod encoder;
pub mod engine;
pub mod router;
pub mod scorer;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Dimension, EncodedInput, PredictionOutput, PredictionStrategy, SiteSelection, Target,
};
pub use encoder::{
    CategoryEncoder, CategoryOptions, EncoderBuildError, EncoderSet, EncodingError, LabelDecoder,
    LabelEncoder,
};
pub use engine::{
    Classifier, ClassifierEngine, InferenceError, ModelShapeError, ObliviousTree,
    ObliviousTreeEnsemble, Prediction, PredictionBasis, PredictionEngine, PredictionError,
    RuleBook, RuleMatch, TreeSplit,
};
pub use router::risk_router;
pub use scorer::{RiskBreakdown, RiskLevel, RiskScorer, RiskTable};
pub use service::{RiskAssessment, RiskAssessmentService};
