//! Trained-classifier inference.
//!
//! Classifier artifacts are oblivious decision-tree ensembles (the model family CatBoost
//! exports): every tree applies the same split at each depth, so a leaf index is the bit
//! pattern of the split outcomes. Each leaf stores one raw score per class and the
//! predicted class code is the argmax of the summed scores.

use std::fmt;

use serde::Deserialize;

use super::super::domain::{Dimension, EncodedInput, Target};

const MAX_TREE_DEPTH: usize = 16;

/// Inference contract shared by every classifier artifact.
pub trait Classifier: fmt::Debug + Send + Sync {
    /// Column names in the order `predict` expects its features.
    fn expected_feature_order(&self) -> &[String];

    fn predict(&self, features: &[f32]) -> Result<u32, InferenceError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("classifier expects feature column '{column}' which no input dimension provides")]
    UnsupportedFeature { column: String },
    #[error("classifier expects {expected} features but received {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("classifier produced {target} class {code} which the label decoder does not know")]
    UnknownClass { target: Target, code: u32 },
    #[error("class index {index} does not fit a class code")]
    ClassIndexOverflow { index: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelShapeError {
    #[error("model declares no feature columns")]
    NoFeatures,
    #[error("model declares no classes")]
    NoClasses,
    #[error("model declares {actual} classes, more than a u32 class code holds")]
    TooManyClasses { actual: usize },
    #[error("bias has {actual} entries but the model has {expected} classes")]
    BiasLength { expected: usize, actual: usize },
    #[error("tree {tree} is deeper than {max} splits", max = MAX_TREE_DEPTH)]
    TooDeep { tree: usize },
    #[error("tree {tree} splits on feature {feature} but only {available} features exist")]
    FeatureOutOfRange {
        tree: usize,
        feature: usize,
        available: usize,
    },
    #[error("tree {tree} has {actual} leaf values, expected {expected}")]
    LeafCount {
        tree: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TreeSplit {
    pub feature: usize,
    pub border: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObliviousTree {
    pub splits: Vec<TreeSplit>,
    /// Flat `[leaf][class]` scores.
    pub leaf_values: Vec<f64>,
}

impl ObliviousTree {
    fn leaf_index(&self, features: &[f32]) -> usize {
        self.splits
            .iter()
            .enumerate()
            .fold(0, |index, (depth, split)| {
                if features[split.feature] > split.border {
                    index | (1 << depth)
                } else {
                    index
                }
            })
    }
}

/// Every deserialized model goes through [`ObliviousTreeEnsemble::new`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawEnsemble")]
pub struct ObliviousTreeEnsemble {
    feature_names: Vec<String>,
    class_count: usize,
    bias: Vec<f64>,
    trees: Vec<ObliviousTree>,
}

#[derive(Deserialize)]
struct RawEnsemble {
    feature_names: Vec<String>,
    class_count: usize,
    #[serde(default)]
    bias: Vec<f64>,
    trees: Vec<ObliviousTree>,
}

impl TryFrom<RawEnsemble> for ObliviousTreeEnsemble {
    type Error = ModelShapeError;

    fn try_from(raw: RawEnsemble) -> Result<Self, Self::Error> {
        Self::new(raw.feature_names, raw.class_count, raw.bias, raw.trees)
    }
}

impl ObliviousTreeEnsemble {
    pub fn new(
        feature_names: Vec<String>,
        class_count: usize,
        bias: Vec<f64>,
        trees: Vec<ObliviousTree>,
    ) -> Result<Self, ModelShapeError> {
        let model = Self {
            feature_names,
            class_count,
            bias,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }

    /// Checks the invariants `class_scores` indexes by.
    fn validate(&self) -> Result<(), ModelShapeError> {
        if self.feature_names.is_empty() {
            return Err(ModelShapeError::NoFeatures);
        }
        if self.class_count == 0 {
            return Err(ModelShapeError::NoClasses);
        }
        if u32::try_from(self.class_count).is_err() {
            return Err(ModelShapeError::TooManyClasses {
                actual: self.class_count,
            });
        }
        if !self.bias.is_empty() && self.bias.len() != self.class_count {
            return Err(ModelShapeError::BiasLength {
                expected: self.class_count,
                actual: self.bias.len(),
            });
        }

        for (tree_index, tree) in self.trees.iter().enumerate() {
            if tree.splits.len() > MAX_TREE_DEPTH {
                return Err(ModelShapeError::TooDeep { tree: tree_index });
            }
            if let Some(split) = tree
                .splits
                .iter()
                .find(|split| split.feature >= self.feature_names.len())
            {
                return Err(ModelShapeError::FeatureOutOfRange {
                    tree: tree_index,
                    feature: split.feature,
                    available: self.feature_names.len(),
                });
            }
            let expected = self.class_count << tree.splits.len();
            if tree.leaf_values.len() != expected {
                return Err(ModelShapeError::LeafCount {
                    tree: tree_index,
                    expected,
                    actual: tree.leaf_values.len(),
                });
            }
        }

        Ok(())
    }

    pub fn class_scores(&self, features: &[f32]) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.feature_names.len() {
            return Err(InferenceError::FeatureCount {
                expected: self.feature_names.len(),
                actual: features.len(),
            });
        }

        let mut scores = if self.bias.is_empty() {
            vec![0.0; self.class_count]
        } else {
            self.bias.clone()
        };

        for tree in &self.trees {
            let offset = tree.leaf_index(features) * self.class_count;
            for (score, leaf) in scores
                .iter_mut()
                .zip(&tree.leaf_values[offset..offset + self.class_count])
            {
                *score += leaf;
            }
        }

        Ok(scores)
    }
}

impl Classifier for ObliviousTreeEnsemble {
    fn expected_feature_order(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &[f32]) -> Result<u32, InferenceError> {
        let scores = self.class_scores(features)?;
        // Strict comparison keeps the lowest class index on ties.
        let best = scores
            .iter()
            .enumerate()
            .fold(0, |best, (index, score)| {
                if *score > scores[best] {
                    index
                } else {
                    best
                }
            });
        u32::try_from(best).map_err(|_| InferenceError::ClassIndexOverflow { index: best })
    }
}

/// Lays the encoded input out in the classifier's own column order.
pub(crate) fn reconcile_features(
    classifier: &dyn Classifier,
    input: &EncodedInput,
) -> Result<Vec<f32>, InferenceError> {
    classifier
        .expected_feature_order()
        .iter()
        .map(|column| {
            Dimension::from_column_name(column)
                .map(|dimension| input.code(dimension) as f32)
                .ok_or_else(|| InferenceError::UnsupportedFeature {
                    column: column.clone(),
                })
        })
        .collect()
}
