use std::fmt;

use serde::{Deserialize, Serialize};

/// Categorical input describing a construction task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    ProjectScale,
    FacilityType,
    WorkType,
}

impl Dimension {
    /// Column order of [`EncodedInput`].
    pub const ALL: [Dimension; 3] = [
        Dimension::ProjectScale,
        Dimension::FacilityType,
        Dimension::WorkType,
    ];

    /// Column name used by the encoder and classifier artifacts.
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::ProjectScale => "Project scale",
            Dimension::FacilityType => "Facility type",
            Dimension::WorkType => "Work type",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|dimension| dimension.column_name().eq_ignore_ascii_case(name))
    }

    fn position(self) -> usize {
        match self {
            Dimension::ProjectScale => 0,
            Dimension::FacilityType => 1,
            Dimension::WorkType => 2,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Label vocabulary produced by a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    InjuryType,
    CauseMaterial,
}

impl Target {
    pub fn column_name(self) -> &'static str {
        match self {
            Target::InjuryType => "Injury type",
            Target::CauseMaterial => "Original cause material",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Raw selections submitted for one assessment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteSelection {
    pub project_scale: String,
    pub facility_type: String,
    pub work_type: String,
}

impl SiteSelection {
    pub fn new(
        project_scale: impl Into<String>,
        facility_type: impl Into<String>,
        work_type: impl Into<String>,
    ) -> Self {
        Self {
            project_scale: project_scale.into(),
            facility_type: facility_type.into(),
            work_type: work_type.into(),
        }
    }

    pub fn value(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::ProjectScale => &self.project_scale,
            Dimension::FacilityType => &self.facility_type,
            Dimension::WorkType => &self.work_type,
        }
    }
}

/// Integer codes in `[ProjectScale, FacilityType, WorkType]` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedInput {
    codes: [u32; 3],
}

impl EncodedInput {
    pub fn new(project_scale: u32, facility_type: u32, work_type: u32) -> Self {
        Self {
            codes: [project_scale, facility_type, work_type],
        }
    }

    pub fn code(&self, dimension: Dimension) -> u32 {
        self.codes[dimension.position()]
    }

    pub fn code_for_column(&self, column: &str) -> Option<u32> {
        Dimension::from_column_name(column).map(|dimension| self.code(dimension))
    }

    pub fn codes(&self) -> [u32; 3] {
        self.codes
    }
}

/// Predicted injury type and cause material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub injury_type: String,
    pub cause_material: String,
}

/// How predictions are produced; fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStrategy {
    RuleBased,
    ClassifierBased,
}

impl PredictionStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "rules" | "rule" | "rule_based" => Some(Self::RuleBased),
            "classifier" | "model" | "classifier_based" => Some(Self::ClassifierBased),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PredictionStrategy::RuleBased => "rule-based",
            PredictionStrategy::ClassifierBased => "classifier-based",
        }
    }
}
