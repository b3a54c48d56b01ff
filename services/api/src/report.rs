use crate::infra::{artifact_store, load_service};
use clap::{Args, ValueEnum};
use site_risk::config::AppConfig;
use site_risk::error::AppError;
use site_risk::workflows::risk::{
    CategoryOptions, Dimension, PredictionStrategy, RiskAssessment, SiteSelection,
};

const DISCLAIMER: &str = "This prediction is for reference only. Actual safety management must \
combine expert judgement with the conditions on site.";

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Project scale, exactly as listed by `options`
    #[arg(long)]
    pub(crate) project_scale: String,
    /// Facility type, exactly as listed by `options`
    #[arg(long)]
    pub(crate) facility_type: String,
    /// Work type, exactly as listed by `options`
    #[arg(long)]
    pub(crate) work_type: String,
    /// Print the assessment as JSON instead of a report
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct OptionsArgs {
    /// Only list one selection dimension
    #[arg(long, value_enum)]
    pub(crate) dimension: Option<DimensionArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum DimensionArg {
    ProjectScale,
    FacilityType,
    WorkType,
}

impl From<DimensionArg> for Dimension {
    fn from(value: DimensionArg) -> Self {
        match value {
            DimensionArg::ProjectScale => Dimension::ProjectScale,
            DimensionArg::FacilityType => Dimension::FacilityType,
            DimensionArg::WorkType => Dimension::WorkType,
        }
    }
}

pub(crate) async fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let AssessArgs {
        project_scale,
        facility_type,
        work_type,
        json,
    } = args;

    let config = AppConfig::load()?;
    let store = artifact_store(&config.risk).await?;
    let service = load_service(&store, &config.risk).await?;
    let assessment = service.assess(SiteSelection::new(project_scale, facility_type, work_type))?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&assessment).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        for line in render_assessment(&assessment) {
            println!("{line}");
        }
    }

    Ok(())
}

pub(crate) async fn run_options(args: OptionsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = artifact_store(&config.risk).await?;
    let service = load_service(&store, &config.risk).await?;
    let options = service.options();

    let dimensions = match args.dimension {
        Some(dimension) => vec![Dimension::from(dimension)],
        None => Dimension::ALL.to_vec(),
    };

    for dimension in dimensions {
        let values = option_values(&options, dimension);
        println!("{dimension} ({} options)", values.len());
        for value in values {
            println!("  - {value}");
        }
    }

    Ok(())
}

fn option_values(options: &CategoryOptions, dimension: Dimension) -> &[String] {
    match dimension {
        Dimension::ProjectScale => &options.project_scale,
        Dimension::FacilityType => &options.facility_type,
        Dimension::WorkType => &options.work_type,
    }
}

fn strategy_note(strategy: PredictionStrategy) -> &'static str {
    match strategy {
        PredictionStrategy::RuleBased => {
            "injury type follows the work type and cause material follows the facility type, \
             using fixed tables with keyword fallbacks"
        }
        PredictionStrategy::ClassifierBased => {
            "injury type and cause material come from the trained classifiers"
        }
    }
}

pub(crate) fn render_assessment(assessment: &RiskAssessment) -> Vec<String> {
    let selection = &assessment.selection;
    let mut lines = vec![
        "Site risk assessment".to_string(),
        format!(
            "- Project scale: {} | Facility type: {} | Work type: {}",
            selection.project_scale, selection.facility_type, selection.work_type
        ),
        format!(
            "- Predicted injury type: {} ({:.4}% | {})",
            assessment.injury_type,
            assessment.injury_risk,
            assessment.injury_level.label()
        ),
        format!(
            "- Predicted cause material: {} ({:.4}% | {})",
            assessment.cause_material,
            assessment.cause_risk,
            assessment.cause_level.label()
        ),
        format!(
            "- Final fatality risk: {:.4}% -> {}",
            assessment.final_risk,
            assessment.risk_level.label()
        ),
        format!("  {}", assessment.advice),
    ];

    if assessment.injury_risk_defaulted {
        lines.push(format!(
            "  Note: no historical risk for injury type '{}'; default score used.",
            assessment.injury_type
        ));
    }
    if assessment.cause_risk_defaulted {
        lines.push(format!(
            "  Note: no historical risk for cause material '{}'; default score used.",
            assessment.cause_material
        ));
    }

    lines.push(format!(
        "Prediction method: {} ({})",
        assessment.strategy.label(),
        strategy_note(assessment.strategy)
    ));
    lines.push(format!("Disclaimer: {DISCLAIMER}"));
    lines
}
