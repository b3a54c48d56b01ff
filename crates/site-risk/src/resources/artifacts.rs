use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::drive::ArtifactFetcher;
use super::store::ArtifactSource;
use super::{ClassifierPair, ResourceLoadError, Resources};
use crate::config::RiskConfig;
use crate::workflows::risk::{
    CategoryEncoder, Dimension, EncoderSet, LabelDecoder, LabelEncoder, ObliviousTreeEnsemble,
    PredictionStrategy, RiskTable, Target,
};

/// Files the service reads at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    RiskTable,
    InjuryEncoders,
    CauseEncoders,
    InjuryClassifier,
    CauseClassifier,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::RiskTable,
        ArtifactKind::InjuryEncoders,
        ArtifactKind::CauseEncoders,
        ArtifactKind::InjuryClassifier,
        ArtifactKind::CauseClassifier,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::RiskTable => "risk_table.csv",
            ArtifactKind::InjuryEncoders => "encoders_injury.json",
            ArtifactKind::CauseEncoders => "encoders_cause.json",
            ArtifactKind::InjuryClassifier => "classifier_injury.json",
            ArtifactKind::CauseClassifier => "classifier_cause.json",
        }
    }

    /// Environment variable holding the Google Drive file id for this artifact.
    pub fn drive_env_var(self) -> &'static str {
        match self {
            ArtifactKind::RiskTable => "RISK_DRIVE_RISK_TABLE_ID",
            ArtifactKind::InjuryEncoders => "RISK_DRIVE_ENCODERS_INJURY_ID",
            ArtifactKind::CauseEncoders => "RISK_DRIVE_ENCODERS_CAUSE_ID",
            ArtifactKind::InjuryClassifier => "RISK_DRIVE_CLASSIFIER_INJURY_ID",
            ArtifactKind::CauseClassifier => "RISK_DRIVE_CLASSIFIER_CAUSE_ID",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ArtifactKind::RiskTable => "risk table",
            ArtifactKind::InjuryEncoders => "injury encoders",
            ArtifactKind::CauseEncoders => "cause encoders",
            ArtifactKind::InjuryClassifier => "injury classifier",
            ArtifactKind::CauseClassifier => "cause classifier",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Deserialize)]
struct RiskRow {
    table: String,
    label: String,
    risk: f64,
}

/// Reads `table,label,risk` rows; `table` is `injury` or `cause`, `risk` a percentage.
pub fn parse_risk_table<R: Read>(reader: R) -> Result<RiskTable, ResourceLoadError> {
    let artifact = ArtifactKind::RiskTable;
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut injury = HashMap::new();
    let mut cause = HashMap::new();

    for record in csv_reader.deserialize::<RiskRow>() {
        let row = record.map_err(|err| invalid(artifact, err.to_string()))?;

        if !row.risk.is_finite() || !(0.0..=100.0).contains(&row.risk) {
            return Err(invalid(
                artifact,
                format!(
                    "risk for '{}' must be a percentage between 0 and 100 (got {})",
                    row.label, row.risk
                ),
            ));
        }

        let table = match row.table.to_ascii_lowercase().as_str() {
            "injury" => &mut injury,
            "cause" => &mut cause,
            other => {
                return Err(invalid(
                    artifact,
                    format!("unknown table '{other}', expected 'injury' or 'cause'"),
                ))
            }
        };

        if table.insert(row.label.clone(), row.risk).is_some() {
            return Err(invalid(
                artifact,
                format!("duplicate {} entry '{}'", row.table, row.label),
            ));
        }
    }

    if injury.is_empty() && cause.is_empty() {
        return Err(invalid(artifact, "no risk rows found".to_string()));
    }

    Ok(RiskTable::new(injury, cause))
}

/// Reads a JSON object of column name to ordered class list.
pub fn parse_encoder_set<R: Read>(
    reader: R,
    artifact: ArtifactKind,
    target: Target,
) -> Result<EncoderSet, ResourceLoadError> {
    let mut columns: BTreeMap<String, Vec<String>> =
        serde_json::from_reader(reader).map_err(|err| invalid(artifact, err.to_string()))?;

    let mut take = |column: &str| -> Result<LabelEncoder, ResourceLoadError> {
        let classes = columns
            .remove(column)
            .ok_or_else(|| invalid(artifact, format!("missing column '{column}'")))?;
        LabelEncoder::new(classes)
            .map_err(|err| invalid(artifact, format!("column '{column}': {err}")))
    };

    let inputs = CategoryEncoder::new(
        take(Dimension::ProjectScale.column_name())?,
        take(Dimension::FacilityType.column_name())?,
        take(Dimension::WorkType.column_name())?,
    );
    let target = LabelDecoder::new(target, take(target.column_name())?);

    Ok(EncoderSet { inputs, target })
}

pub fn parse_classifier<R: Read>(
    reader: R,
    artifact: ArtifactKind,
) -> Result<ObliviousTreeEnsemble, ResourceLoadError> {
    serde_json::from_reader(reader).map_err(|err| invalid(artifact, err.to_string()))
}

/// A model must predict exactly the labels its encoder artifact can decode.
fn check_class_count(
    model: &ObliviousTreeEnsemble,
    encoders: &EncoderSet,
    artifact: ArtifactKind,
) -> Result<(), ResourceLoadError> {
    let labels = encoders.target.labels().len();
    if model.class_count() == labels {
        return Ok(());
    }
    Err(invalid(
        artifact,
        format!(
            "model declares {} classes but the {} decoder knows {labels} labels",
            model.class_count(),
            encoders.target.target()
        ),
    ))
}

fn invalid(artifact: ArtifactKind, reason: String) -> ResourceLoadError {
    ResourceLoadError::Invalid { artifact, reason }
}

struct RemoteArtifacts {
    fetcher: Box<dyn ArtifactFetcher>,
    file_ids: BTreeMap<ArtifactKind, String>,
}

/// Reads artifacts from a directory, fetching missing files when a remote is attached.
pub struct FileArtifactSource {
    dir: PathBuf,
    strategy: PredictionStrategy,
    file_ids: BTreeMap<ArtifactKind, String>,
    remote: Option<RemoteArtifacts>,
}

impl FileArtifactSource {
    pub fn new(dir: impl Into<PathBuf>, strategy: PredictionStrategy) -> Self {
        Self {
            dir: dir.into(),
            strategy,
            file_ids: BTreeMap::new(),
            remote: None,
        }
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        let mut source = Self::new(config.artifact_dir.clone(), config.strategy);
        source.file_ids = config.drive_file_ids.clone();
        source
    }

    /// Attaches a fetcher used for artifacts that are absent locally and have a file id.
    pub fn with_fetcher(mut self, fetcher: Box<dyn ArtifactFetcher>) -> Self {
        let file_ids = std::mem::take(&mut self.file_ids);
        self.remote = Some(RemoteArtifacts { fetcher, file_ids });
        self
    }

    pub fn with_file_id(mut self, artifact: ArtifactKind, file_id: impl Into<String>) -> Self {
        let file_ids = match self.remote.as_mut() {
            Some(remote) => &mut remote.file_ids,
            None => &mut self.file_ids,
        };
        file_ids.insert(artifact, file_id.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: ArtifactKind) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    fn open(&self, artifact: ArtifactKind) -> Result<File, ResourceLoadError> {
        let path = self.ensure_local(artifact)?;
        File::open(&path).map_err(|err| ResourceLoadError::Read {
            artifact,
            path,
            reason: err.to_string(),
        })
    }

    fn ensure_local(&self, artifact: ArtifactKind) -> Result<PathBuf, ResourceLoadError> {
        let path = self.path(artifact);
        if path.is_file() {
            return Ok(path);
        }

        let Some(remote) = self.remote.as_ref() else {
            if let Some(file_id) = self.file_ids.get(&artifact) {
                return Err(ResourceLoadError::Fetch {
                    artifact,
                    reason: format!(
                        "drive file id '{file_id}' is set but no drive credentials are attached"
                    ),
                });
            }
            return Err(ResourceLoadError::Missing { artifact, path });
        };
        let Some(file_id) = remote.file_ids.get(&artifact) else {
            return Err(ResourceLoadError::Missing { artifact, path });
        };

        info!(%artifact, %file_id, path = %path.display(), "fetching artifact from drive");
        let bytes = remote
            .fetcher
            .fetch(file_id)
            .map_err(|err| ResourceLoadError::Fetch {
                artifact,
                reason: err.to_string(),
            })?;

        let write_error = |err: std::io::Error| ResourceLoadError::Read {
            artifact,
            path: path.clone(),
            reason: format!("could not store fetched artifact: {err}"),
        };
        fs::create_dir_all(&self.dir).map_err(write_error)?;
        let partial = path.with_extension("partial");
        fs::write(&partial, &bytes).map_err(write_error)?;
        fs::rename(&partial, &path).map_err(write_error)?;

        Ok(path)
    }
}

impl ArtifactSource for FileArtifactSource {
    fn load(&self) -> Result<Resources, ResourceLoadError> {
        let risk_table = parse_risk_table(self.open(ArtifactKind::RiskTable)?)?;
        let injury_encoders = parse_encoder_set(
            self.open(ArtifactKind::InjuryEncoders)?,
            ArtifactKind::InjuryEncoders,
            Target::InjuryType,
        )?;
        let cause_encoders = parse_encoder_set(
            self.open(ArtifactKind::CauseEncoders)?,
            ArtifactKind::CauseEncoders,
            Target::CauseMaterial,
        )?;

        let classifiers = match self.strategy {
            PredictionStrategy::RuleBased => None,
            PredictionStrategy::ClassifierBased => {
                let injury = parse_classifier(
                    self.open(ArtifactKind::InjuryClassifier)?,
                    ArtifactKind::InjuryClassifier,
                )?;
                let cause = parse_classifier(
                    self.open(ArtifactKind::CauseClassifier)?,
                    ArtifactKind::CauseClassifier,
                )?;
                check_class_count(&injury, &injury_encoders, ArtifactKind::InjuryClassifier)?;
                check_class_count(&cause, &cause_encoders, ArtifactKind::CauseClassifier)?;
                Some(ClassifierPair {
                    injury: Arc::new(injury),
                    cause: Arc::new(cause),
                })
            }
        };

        Ok(Resources {
            injury_encoders,
            cause_encoders,
            risk_table: Arc::new(risk_table),
            classifiers,
        })
    }
}

impl fmt::Debug for FileArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileArtifactSource")
            .field("dir", &self.dir)
            .field("strategy", &self.strategy)
            .field("remote", &self.remote.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::resources::{ArtifactFetcher, FetchError};

    const RISK_TABLE: &str = "\
table,label,risk
injury,Fall,40.0
injury,Electric shock,20.0
cause, Power machine ,22.0
cause,Ladder,10.0
";

    const INJURY_ENCODERS: &str = r#"{
        "Project scale": ["Large", "Small"],
        "Facility type": ["Factory", "Office"],
        "Work type": ["Electric wiring work", "Steel work"],
        "Injury type": ["Electric shock", "Fall"]
    }"#;

    const CAUSE_ENCODERS: &str = r#"{
        "Project scale": ["Large", "Small"],
        "Facility type": ["Factory", "Office"],
        "Work type": ["Electric wiring work", "Steel work"],
        "Original cause material": ["Ladder", "Power machine"]
    }"#;

    const CLASSIFIER: &str = r#"{
        "feature_names": ["Work type"],
        "class_count": 2,
        "trees": [
            { "splits": [{ "feature": 0, "border": 0.5 }], "leaf_values": [1.0, 0.0, 0.0, 1.0] }
        ]
    }"#;

    fn write_rule_artifacts(dir: &Path) {
        fs::write(dir.join("risk_table.csv"), RISK_TABLE).expect("write risk table");
        fs::write(dir.join("encoders_injury.json"), INJURY_ENCODERS).expect("write encoders");
        fs::write(dir.join("encoders_cause.json"), CAUSE_ENCODERS).expect("write encoders");
    }

    #[derive(Debug, Default)]
    struct StaticFetcher {
        calls: AtomicUsize,
    }

    impl ArtifactFetcher for StaticFetcher {
        fn fetch(&self, file_id: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match file_id {
                "classifier-file" => Ok(CLASSIFIER.as_bytes().to_vec()),
                other => Err(FetchError::Backend(format!("file {other} not found"))),
            }
        }
    }

    #[test]
    fn risk_table_parses_both_sections() {
        let table = parse_risk_table(RISK_TABLE.as_bytes()).expect("parse");

        assert_eq!(table.injury_risk("Fall"), Some(40.0));
        assert_eq!(table.cause_risk("Power machine"), Some(22.0));
        assert_eq!(table.injury_len(), 2);
        assert_eq!(table.cause_len(), 2);
    }

    #[test]
    fn risk_outside_percentage_range_is_rejected() {
        let error = parse_risk_table("table,label,risk\ninjury,Fall,140\n".as_bytes())
            .expect_err("out of range");

        assert!(matches!(
            error,
            ResourceLoadError::Invalid {
                artifact: ArtifactKind::RiskTable,
                ..
            }
        ));
        assert!(error.to_string().contains("between 0 and 100"));
    }

    #[test]
    fn risk_table_rejects_unknown_sections_duplicates_and_empty_files() {
        assert!(parse_risk_table("table,label,risk\nweather,Rain,3\n".as_bytes()).is_err());
        assert!(
            parse_risk_table("table,label,risk\ncause,Ladder,3\ncause,Ladder,4\n".as_bytes())
                .is_err()
        );
        assert!(parse_risk_table("table,label,risk\n".as_bytes()).is_err());
        assert!(parse_risk_table("table,label,risk\ncause,Ladder,high\n".as_bytes()).is_err());
    }

    #[test]
    fn encoder_set_reads_inputs_and_target() {
        let set = parse_encoder_set(
            INJURY_ENCODERS.as_bytes(),
            ArtifactKind::InjuryEncoders,
            Target::InjuryType,
        )
        .expect("parse");

        assert_eq!(set.inputs.encode(Dimension::WorkType, "Steel work"), Ok(1));
        assert_eq!(set.target.target(), Target::InjuryType);
        assert_eq!(set.target.decode(1), Ok("Fall"));
    }

    #[test]
    fn encoder_set_requires_the_target_column() {
        let error = parse_encoder_set(
            INJURY_ENCODERS.as_bytes(),
            ArtifactKind::CauseEncoders,
            Target::CauseMaterial,
        )
        .expect_err("injury encoders lack the cause column");

        assert_eq!(error.artifact(), Some(ArtifactKind::CauseEncoders));
        assert!(error.to_string().contains("Original cause material"));
    }

    #[test]
    fn encoder_set_rejects_duplicate_classes() {
        let raw = r#"{
            "Project scale": ["Large", "Large"],
            "Facility type": ["Factory"],
            "Work type": ["Steel work"],
            "Injury type": ["Fall"]
        }"#;

        let error = parse_encoder_set(
            raw.as_bytes(),
            ArtifactKind::InjuryEncoders,
            Target::InjuryType,
        )
        .expect_err("duplicate class");
        assert!(error.to_string().contains("Project scale"));
    }

    #[test]
    fn classifier_shape_is_validated_on_load() {
        let raw = r#"{
            "feature_names": ["Work type"],
            "class_count": 2,
            "trees": [{ "splits": [{ "feature": 0, "border": 0.5 }], "leaf_values": [1.0] }]
        }"#;

        let error = parse_classifier(raw.as_bytes(), ArtifactKind::InjuryClassifier)
            .expect_err("leaf count mismatch");
        assert!(matches!(
            error,
            ResourceLoadError::Invalid {
                artifact: ArtifactKind::InjuryClassifier,
                ..
            }
        ));
        assert!(parse_classifier(CLASSIFIER.as_bytes(), ArtifactKind::CauseClassifier).is_ok());
    }

    #[test]
    fn rule_strategy_loads_without_classifiers() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_rule_artifacts(dir.path());

        let resources = FileArtifactSource::new(dir.path(), PredictionStrategy::RuleBased)
            .load()
            .expect("load");

        assert!(resources.classifiers.is_none());
        assert_eq!(resources.options().work_type.len(), 2);
        assert_eq!(resources.risk_table.cause_risk("Ladder"), Some(10.0));
    }

    #[test]
    fn missing_artifact_reports_its_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_rule_artifacts(dir.path());
        let source = FileArtifactSource::new(dir.path(), PredictionStrategy::ClassifierBased);

        let error = source.load().expect_err("classifiers absent");

        assert_eq!(
            error,
            ResourceLoadError::Missing {
                artifact: ArtifactKind::InjuryClassifier,
                path: dir.path().join("classifier_injury.json"),
            }
        );
    }

    #[test]
    fn fetcher_fills_in_missing_artifacts() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_rule_artifacts(dir.path());
        let source = FileArtifactSource::new(dir.path(), PredictionStrategy::ClassifierBased)
            .with_fetcher(Box::new(StaticFetcher::default()))
            .with_file_id(ArtifactKind::InjuryClassifier, "classifier-file")
            .with_file_id(ArtifactKind::CauseClassifier, "classifier-file");

        let resources = source.load().expect("load");

        assert!(resources.classifiers.is_some());
        assert!(source.path(ArtifactKind::InjuryClassifier).is_file());
        assert!(source.path(ArtifactKind::CauseClassifier).is_file());
        assert!(!dir.path().join("classifier_injury.partial").exists());
    }

    #[test]
    fn local_files_take_precedence_over_remote() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_rule_artifacts(dir.path());
        let source = FileArtifactSource::new(dir.path(), PredictionStrategy::RuleBased)
            .with_file_id(ArtifactKind::RiskTable, "missing-file")
            .with_fetcher(Box::new(StaticFetcher::default()));

        assert!(source.load().is_ok());
    }

    #[test]
    fn fetch_failure_names_the_artifact() {
        let dir = tempfile::tempdir().expect("temp dir");
        let source = FileArtifactSource::new(dir.path(), PredictionStrategy::RuleBased)
            .with_fetcher(Box::new(StaticFetcher::default()))
            .with_file_id(ArtifactKind::RiskTable, "missing-file");

        let error = source.load().expect_err("fetch fails");

        assert!(matches!(
            error,
            ResourceLoadError::Fetch {
                artifact: ArtifactKind::RiskTable,
                ..
            }
        ));
        assert!(error.to_string().contains("missing-file"));
    }

    #[test]
    fn configured_file_id_without_fetcher_is_a_fetch_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = RiskConfig {
            artifact_dir: dir.path().to_path_buf(),
            drive_file_ids: BTreeMap::from([(ArtifactKind::RiskTable, "abc123".to_string())]),
            ..RiskConfig::default()
        };

        let error = FileArtifactSource::from_config(&config)
            .load()
            .expect_err("nothing can fetch the file id");

        assert!(matches!(
            error,
            ResourceLoadError::Fetch {
                artifact: ArtifactKind::RiskTable,
                ..
            }
        ));
        assert!(error.to_string().contains("abc123"));
        assert!(error.to_string().contains("no drive credentials"));
    }

    #[test]
    fn classifier_classes_must_match_the_decoder() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_rule_artifacts(dir.path());
        let three_classes = r#"{
            "feature_names": ["Work type"],
            "class_count": 3,
            "trees": []
        }"#;
        fs::write(dir.path().join("classifier_injury.json"), three_classes)
            .expect("write classifier");
        fs::write(dir.path().join("classifier_cause.json"), CLASSIFIER).expect("write classifier");

        let error = FileArtifactSource::new(dir.path(), PredictionStrategy::ClassifierBased)
            .load()
            .expect_err("decoder knows two injury types");

        assert!(matches!(
            error,
            ResourceLoadError::Invalid {
                artifact: ArtifactKind::InjuryClassifier,
                ..
            }
        ));
        assert!(error.to_string().contains("3 classes"));
        assert!(error.to_string().contains("2 labels"));
    }

    #[test]
    fn config_file_ids_carry_over_to_the_fetcher() {
        let config = RiskConfig {
            artifact_dir: PathBuf::from("/srv/artifacts"),
            drive_file_ids: BTreeMap::from([(ArtifactKind::RiskTable, "abc123".to_string())]),
            ..RiskConfig::default()
        };

        let source = FileArtifactSource::from_config(&config)
            .with_fetcher(Box::new(StaticFetcher::default()));

        assert_eq!(source.dir(), Path::new("/srv/artifacts"));
        let remote = source.remote.as_ref().expect("remote attached");
        assert_eq!(
            remote.file_ids.get(&ArtifactKind::RiskTable).map(String::as_str),
            Some("abc123")
        );
    }
}
