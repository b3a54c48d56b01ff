use std::collections::HashMap;

use serde::Serialize;

use super::domain::{Dimension, EncodedInput, SiteSelection, Target};

/// Ordered vocabulary where each class encodes to its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, u32>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, EncoderBuildError> {
        if classes.is_empty() {
            return Err(EncoderBuildError::Empty);
        }

        let mut index = HashMap::with_capacity(classes.len());
        for (position, class) in classes.iter().enumerate() {
            let code = u32::try_from(position).map_err(|_| EncoderBuildError::TooLarge)?;
            if index.insert(class.clone(), code).is_some() {
                return Err(EncoderBuildError::Duplicate(class.clone()));
            }
        }

        Ok(Self { classes, index })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn transform(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    pub fn inverse_transform(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncoderBuildError {
    #[error("class list is empty")]
    Empty,
    #[error("class '{0}' appears more than once")]
    Duplicate(String),
    #[error("class list exceeds the u32 code space")]
    TooLarge,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("unknown {column} '{value}'")]
    UnknownCategory { column: &'static str, value: String },
    #[error("code {code} is outside the known {column} range")]
    UnknownCode { column: &'static str, code: u32 },
}

/// Encoders for the three input dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEncoder {
    project_scale: LabelEncoder,
    facility_type: LabelEncoder,
    work_type: LabelEncoder,
}

impl CategoryEncoder {
    pub fn new(
        project_scale: LabelEncoder,
        facility_type: LabelEncoder,
        work_type: LabelEncoder,
    ) -> Self {
        Self {
            project_scale,
            facility_type,
            work_type,
        }
    }

    fn encoder(&self, dimension: Dimension) -> &LabelEncoder {
        match dimension {
            Dimension::ProjectScale => &self.project_scale,
            Dimension::FacilityType => &self.facility_type,
            Dimension::WorkType => &self.work_type,
        }
    }

    /// Selectable values for a dimension, in code order.
    pub fn classes(&self, dimension: Dimension) -> &[String] {
        self.encoder(dimension).classes()
    }

    pub fn encode(&self, dimension: Dimension, value: &str) -> Result<u32, EncodingError> {
        self.encoder(dimension)
            .transform(value)
            .ok_or_else(|| EncodingError::UnknownCategory {
                column: dimension.column_name(),
                value: value.to_string(),
            })
    }

    pub fn decode(&self, dimension: Dimension, code: u32) -> Result<&str, EncodingError> {
        self.encoder(dimension)
            .inverse_transform(code)
            .ok_or(EncodingError::UnknownCode {
                column: dimension.column_name(),
                code,
            })
    }

    pub fn encode_selection(
        &self,
        selection: &SiteSelection,
    ) -> Result<EncodedInput, EncodingError> {
        Ok(EncodedInput::new(
            self.encode(Dimension::ProjectScale, &selection.project_scale)?,
            self.encode(Dimension::FacilityType, &selection.facility_type)?,
            self.encode(Dimension::WorkType, &selection.work_type)?,
        ))
    }

    pub fn options(&self) -> CategoryOptions {
        CategoryOptions {
            project_scale: self.project_scale.classes().to_vec(),
            facility_type: self.facility_type.classes().to_vec(),
            work_type: self.work_type.classes().to_vec(),
        }
    }
}

/// Option lists offered to a selection UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOptions {
    pub project_scale: Vec<String>,
    pub facility_type: Vec<String>,
    pub work_type: Vec<String>,
}

/// Turns classifier class codes back into labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDecoder {
    target: Target,
    encoder: LabelEncoder,
}

impl LabelDecoder {
    pub fn new(target: Target, encoder: LabelEncoder) -> Self {
        Self { target, encoder }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn labels(&self) -> &[String] {
        self.encoder.classes()
    }

    pub fn encode(&self, label: &str) -> Result<u32, EncodingError> {
        self.encoder
            .transform(label)
            .ok_or_else(|| EncodingError::UnknownCategory {
                column: self.target.column_name(),
                value: label.to_string(),
            })
    }

    pub fn decode(&self, code: u32) -> Result<&str, EncodingError> {
        self.encoder
            .inverse_transform(code)
            .ok_or(EncodingError::UnknownCode {
                column: self.target.column_name(),
                code,
            })
    }
}

/// Input encoders plus the target decoder shipped in one encoder artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSet {
    pub inputs: CategoryEncoder,
    pub target: LabelDecoder,
}
