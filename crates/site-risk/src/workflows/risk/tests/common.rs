use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::resources::{ClassifierPair, Resources};
use crate::workflows::risk::{
    CategoryEncoder, Classifier, EncoderSet, InferenceError, LabelDecoder, LabelEncoder,
    ObliviousTree, ObliviousTreeEnsemble, PredictionStrategy, RiskAssessmentService, RiskTable,
    SiteSelection, Target, TreeSplit,
};

pub(super) const PROJECT_SCALES: &[&str] = &["Large", "Medium", "Small"];
pub(super) const FACILITY_TYPES: &[&str] = &[
    "Bridge",
    "Factory",
    "Office",
    "Road",
    "Underground water reservoir",
];
pub(super) const WORK_TYPES: &[&str] = &[
    "Electric wiring work",
    "Formwork",
    "Steel work",
    "Underwater welding",
];
pub(super) const INJURY_TYPES: &[&str] = &[
    "Be bumped",
    "Collapse",
    "Electric shock",
    "Fall",
    "Fire",
];
pub(super) const CAUSE_MATERIALS: &[&str] = &[
    "Excavator",
    "Ladder",
    "Material",
    "Power machine",
    "Tower crane",
];

pub(super) fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) fn label_encoder(values: &[&str]) -> LabelEncoder {
    LabelEncoder::new(strings(values)).expect("valid class list")
}

pub(super) fn category_encoder() -> CategoryEncoder {
    CategoryEncoder::new(
        label_encoder(PROJECT_SCALES),
        label_encoder(FACILITY_TYPES),
        label_encoder(WORK_TYPES),
    )
}

pub(super) fn injury_encoders() -> EncoderSet {
    EncoderSet {
        inputs: category_encoder(),
        target: LabelDecoder::new(Target::InjuryType, label_encoder(INJURY_TYPES)),
    }
}

pub(super) fn cause_encoders() -> EncoderSet {
    EncoderSet {
        inputs: category_encoder(),
        target: LabelDecoder::new(Target::CauseMaterial, label_encoder(CAUSE_MATERIALS)),
    }
}

pub(super) fn risk_table() -> RiskTable {
    let injury = [
        ("Fall", 40.0),
        ("Electric shock", 20.0),
        ("Fire", 12.0),
        ("Collapse", 35.0),
        ("Be bumped", 18.0),
    ];
    let cause = [
        ("Power machine", 22.0),
        ("Ladder", 10.0),
        ("Tower crane", 45.0),
        ("Material", 8.0),
        ("Excavator", 16.0),
    ];
    RiskTable::new(to_map(&injury), to_map(&cause))
}

pub(super) fn to_map(entries: &[(&str, f64)]) -> HashMap<String, f64> {
    entries
        .iter()
        .map(|(label, risk)| (label.to_string(), *risk))
        .collect()
}

pub(super) fn selection(
    project_scale: &str,
    facility_type: &str,
    work_type: &str,
) -> SiteSelection {
    SiteSelection::new(project_scale, facility_type, work_type)
}

pub(super) fn rule_resources() -> Arc<Resources> {
    Arc::new(Resources {
        injury_encoders: injury_encoders(),
        cause_encoders: cause_encoders(),
        risk_table: Arc::new(risk_table()),
        classifiers: None,
    })
}

pub(super) fn classifier_resources<I, C>(injury: I, cause: C) -> Arc<Resources>
where
    I: Classifier + 'static,
    C: Classifier + 'static,
{
    Arc::new(Resources {
        injury_encoders: injury_encoders(),
        cause_encoders: cause_encoders(),
        risk_table: Arc::new(risk_table()),
        classifiers: Some(ClassifierPair {
            injury: Arc::new(injury),
            cause: Arc::new(cause),
        }),
    })
}

pub(super) fn rule_service() -> RiskAssessmentService {
    RiskAssessmentService::new(rule_resources(), PredictionStrategy::RuleBased, 0.0)
        .expect("rule service builds")
}

/// One-split ensemble: class `above` when `column > border`, otherwise class `below`.
pub(super) fn stump(
    columns: &[&str],
    feature: usize,
    border: f32,
    below: usize,
    above: usize,
    class_count: usize,
) -> ObliviousTreeEnsemble {
    let mut leaf_values = vec![0.0; class_count * 2];
    leaf_values[below] = 1.0;
    leaf_values[class_count + above] = 1.0;

    ObliviousTreeEnsemble::new(
        strings(columns),
        class_count,
        Vec::new(),
        vec![ObliviousTree {
            splits: vec![TreeSplit { feature, border }],
            leaf_values,
        }],
    )
    .expect("valid stump")
}

/// Returns a fixed class and remembers the features it was given.
#[derive(Debug)]
pub(super) struct RecordingClassifier {
    columns: Vec<String>,
    code: u32,
    seen: Mutex<Vec<Vec<f32>>>,
}

impl RecordingClassifier {
    pub(super) fn new(columns: &[&str], code: u32) -> Self {
        Self {
            columns: strings(columns),
            code,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn seen(&self) -> Vec<Vec<f32>> {
        self.seen.lock().expect("classifier mutex poisoned").clone()
    }
}

impl Classifier for RecordingClassifier {
    fn expected_feature_order(&self) -> &[String] {
        &self.columns
    }

    fn predict(&self, features: &[f32]) -> Result<u32, InferenceError> {
        self.seen
            .lock()
            .expect("classifier mutex poisoned")
            .push(features.to_vec());
        Ok(self.code)
    }
}

impl Classifier for Arc<RecordingClassifier> {
    fn expected_feature_order(&self) -> &[String] {
        self.as_ref().expected_feature_order()
    }

    fn predict(&self, features: &[f32]) -> Result<u32, InferenceError> {
        self.as_ref().predict(features)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
