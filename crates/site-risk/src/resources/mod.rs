//! Read-only artifacts shared by every assessment: encoder vocabularies, the risk table
//! and, for the classifier strategy, the two trained classifiers.

mod artifacts;
mod drive;
mod store;

pub use artifacts::{
    parse_classifier, parse_encoder_set, parse_risk_table, ArtifactKind, FileArtifactSource,
};
pub use drive::{ArtifactFetcher, DriveConnector, FetchError, GoogleDriveFetcher};
pub use store::{ArtifactSource, ResourceState, ResourceStore};

use std::path::PathBuf;
use std::sync::Arc;

use crate::workflows::risk::{CategoryOptions, Classifier, EncoderSet, RiskTable};

/// Everything loaded at startup. Never mutated after construction.
#[derive(Debug)]
pub struct Resources {
    /// Also the source of the selectable option lists.
    pub injury_encoders: EncoderSet,
    pub cause_encoders: EncoderSet,
    pub risk_table: Arc<RiskTable>,
    pub classifiers: Option<ClassifierPair>,
}

impl Resources {
    pub fn options(&self) -> CategoryOptions {
        self.injury_encoders.inputs.options()
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierPair {
    pub injury: Arc<dyn Classifier>,
    pub cause: Arc<dyn Classifier>,
}

/// Startup failure. Cached by [`ResourceStore`], so it must stay cheap to clone.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceLoadError {
    #[error("required {artifact} not found at {}", .path.display())]
    Missing { artifact: ArtifactKind, path: PathBuf },
    #[error("failed to read {artifact} from {}: {reason}", .path.display())]
    Read {
        artifact: ArtifactKind,
        path: PathBuf,
        reason: String,
    },
    #[error("{artifact} is malformed: {reason}")]
    Invalid {
        artifact: ArtifactKind,
        reason: String,
    },
    #[error("failed to fetch {artifact} from remote storage: {reason}")]
    Fetch {
        artifact: ArtifactKind,
        reason: String,
    },
    #[error("artifact loader panicked: {reason}")]
    Panicked { reason: String },
}

impl ResourceLoadError {
    /// The artifact at fault, if the failure can be pinned on one.
    pub fn artifact(&self) -> Option<ArtifactKind> {
        match self {
            ResourceLoadError::Missing { artifact, .. }
            | ResourceLoadError::Read { artifact, .. }
            | ResourceLoadError::Invalid { artifact, .. }
            | ResourceLoadError::Fetch { artifact, .. } => Some(*artifact),
            ResourceLoadError::Panicked { .. } => None,
        }
    }
}
