use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;

use super::super::domain::{PredictionOutput, SiteSelection};

static INJURY_BY_WORK_TYPE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
static CAUSE_BY_FACILITY_TYPE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

const DEFAULT_INJURY: &str = "Fall";
const DEFAULT_CAUSE: &str = "Material";

// Checked in order; the first cue found in the lowercased value wins.
const WORK_TYPE_CUES: &[(&[&str], &str)] = &[
    (&["electric"], "Electric shock"),
    (&["fire", "weld"], "Fire"),
    (&["cut", "saw"], "Cut"),
    (&["machine"], "Be bumped"),
    (&["water"], "Be drowned"),
];

const FACILITY_TYPE_CUES: &[(&[&str], &str)] = &[
    (&["factory", "industrial"], "Power machine"),
    (&["office", "building"], "Ladder"),
    (&["transport", "road"], "Transportation vehicle"),
    (&["water", "tunnel"], "Excavator"),
];

/// Why a rule-based label was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "keyword", rename_all = "snake_case")]
pub enum RuleMatch {
    Mapped,
    Cue(&'static str),
    Default,
}

/// Static work-type and facility-type tables with keyword fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBook;

impl RuleBook {
    pub fn injury_for(&self, work_type: &str) -> (&'static str, RuleMatch) {
        if let Some(injury) = injury_map().get(work_type.trim()).copied() {
            return (injury, RuleMatch::Mapped);
        }
        match_cue(work_type, WORK_TYPE_CUES).unwrap_or((DEFAULT_INJURY, RuleMatch::Default))
    }

    pub fn cause_for(&self, facility_type: &str) -> (&'static str, RuleMatch) {
        if let Some(cause) = cause_map().get(facility_type.trim()).copied() {
            return (cause, RuleMatch::Mapped);
        }
        match_cue(facility_type, FACILITY_TYPE_CUES)
            .unwrap_or((DEFAULT_CAUSE, RuleMatch::Default))
    }

    /// Total over every input; project scale does not influence the tables.
    pub fn predict(&self, selection: &SiteSelection) -> (PredictionOutput, RuleMatch, RuleMatch) {
        let (injury_type, injury_match) = self.injury_for(&selection.work_type);
        let (cause_material, cause_match) = self.cause_for(&selection.facility_type);

        (
            PredictionOutput {
                injury_type: injury_type.to_string(),
                cause_material: cause_material.to_string(),
            },
            injury_match,
            cause_match,
        )
    }
}

fn match_cue(
    value: &str,
    cues: &[(&[&'static str], &'static str)],
) -> Option<(&'static str, RuleMatch)> {
    let lowered = value.to_lowercase();
    cues.iter().find_map(|(keywords, label)| {
        keywords
            .iter()
            .find(|keyword| lowered.contains(**keyword))
            .map(|keyword| (*label, RuleMatch::Cue(*keyword)))
    })
}

fn injury_map() -> &'static HashMap<&'static str, &'static str> {
    INJURY_BY_WORK_TYPE.get_or_init(|| {
        const WORK_TO_INJURY: &[(&str, &str)] = &[
            // Work at height
            ("Steel work", "Fall"),
            ("Reinforced concrete work", "Fall"),
            ("Roof and gutter work", "Fall"),
            ("Scaffolding work", "Fall"),
            ("Foundation work", "Fall"),
            ("Air handler work", "Fall"),
            ("Duct work", "Fall"),
            ("Insulation work", "Fall"),
            ("Masonry work", "Fall"),
            ("Temporary work", "Fall"),
            // Electrical and hot work
            ("Electric wiring work", "Electric shock"),
            ("Fire protection work", "Electric shock"),
            ("Welding work", "Fire"),
            ("Paint work", "Fire"),
            // Cutting and finishing
            ("Carpentry work", "Cut"),
            ("Metal work", "Cut"),
            ("Stone work", "Cut"),
            ("Interior finishing work", "Cut"),
            ("Tile work", "Cut"),
            ("Window and glass work", "Cut"),
            ("Landscaping work", "Cut"),
            // Ground and structure
            ("Demolition work", "Collapse"),
            ("Earth work", "Collapse"),
            ("Excavation work", "Collapse"),
            ("Maintenance work (including demolition)", "Collapse"),
            ("Tunnel work", "Collapse"),
            // Plant and vehicles
            ("Construction machine", "Be bumped"),
            ("Transportation", "Be bumped"),
            ("Crane operation", "Be bumped"),
            // Wet work
            ("Plumbing work", "Fall beneath"),
            ("Waterproof work", "Fall beneath"),
            ("Harbor work", "Be drowned"),
            ("River work", "Be drowned"),
        ];

        WORK_TO_INJURY.iter().copied().collect()
    })
}

fn cause_map() -> &'static HashMap<&'static str, &'static str> {
    CAUSE_BY_FACILITY_TYPE.get_or_init(|| {
        const FACILITY_TO_CAUSE: &[(&str, &str)] = &[
            ("Factory", "Power machine"),
            ("Industrial facility", "Power machine"),
            ("Power Plant", "Electrical equipment"),
            ("Broadcasting & Communication", "Electrical equipment"),
            // Buildings
            ("Office", "Ladder"),
            ("Complex building", "Ladder"),
            ("Multi-family house", "Ladder"),
            ("Single family house", "Ladder"),
            ("Accommodation", "Ladder"),
            // Civil works
            ("Bridge", "Tower crane"),
            ("Road", "Transportation vehicle"),
            ("Railroad", "Transportation vehicle"),
            ("Transportation", "Transportation vehicle"),
            ("Seaport", "Transportation vehicle"),
            ("Airport", "Transportation vehicle"),
            ("Tunnel", "Excavator"),
            ("Water & Sewage", "Excavator"),
            ("Environment facility", "Excavator"),
            // Public and assembly
            ("Medical facility", "Safety facilities"),
            ("Education facility", "Safety facilities"),
            ("Cultural & Assembly", "Safety facilities"),
            ("Religious", "Safety facilities"),
            ("Sport facility", "Safety facilities"),
            ("Elderly & Child care", "Safety facilities"),
            ("Amusement", "Safety facilities"),
            ("Correctional & Military", "Safety facilities"),
            // Everything else
            ("Retail", "Material"),
            ("Neighborhood living facility", "Material"),
            ("Hazardous Waste Storage", "Material"),
            ("Landscape", "Hand tools"),
            ("Traditional Korean House", "Hand tools"),
            ("Animal & Plant care", "Hand tools"),
        ];

        FACILITY_TO_CAUSE.iter().copied().collect()
    })
}

#[cfg(test)]
pub(crate) fn table_sizes_for_tests() -> (usize, usize) {
    (injury_map().len(), cause_map().len())
}
