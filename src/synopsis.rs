//! The structured synopsis record.
//!
//! [`ProtocolSynopsis`] mirrors, field for field, the JSON object the model is
//! asked to produce (see [`crate::prompts::DEFAULT_SYSTEM_PROMPT`]). Serde
//! derives give the canonical JSON form used for output files; parsing of
//! *model replies* goes through [`crate::schema::parse_synopsis`] instead,
//! which tolerates the shape quirks models introduce and reports
//! field-specific errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One treatment arm of the study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyArm {
    pub arm_name: String,
    pub treatment_description: String,
    pub dosing_schedule: String,
}

/// Dose, frequency and route for one drug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DosageInfo {
    pub drug_name: String,
    pub dose: String,
    pub frequency: String,
    pub route_of_administration: String,
}

/// A duration as the protocol states it: free text ("52 weeks") or a bare
/// number when the model only returns the count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Number(i64),
    Text(String),
}

impl DurationValue {
    /// Empty text or zero.
    pub fn is_blank(&self) -> bool {
        match self {
            DurationValue::Number(n) => *n == 0,
            DurationValue::Text(s) => s.trim().is_empty(),
        }
    }
}

impl Default for DurationValue {
    fn default() -> Self {
        DurationValue::Text(String::new())
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationValue::Number(n) => write!(f, "{n}"),
            DurationValue::Text(s) => f.write_str(s),
        }
    }
}

/// Condensed structured summary of a clinical trial protocol.
///
/// `Option` fields are the ones the protocol may legitimately not have
/// (no comparator, no exploratory endpoints, no interim analysis). All other
/// fields must be present in every model reply, even if empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSynopsis {
    // Basic study information
    pub protocol_title: String,
    pub short_title: String,
    pub protocol_number: String,
    pub version_and_date: String,
    pub study_phase: String,
    pub indication: String,
    pub sponsor: String,

    // Study rationale
    pub background: String,
    pub mechanism_of_action: String,
    pub justification_for_study_design: String,

    // Objectives & endpoints
    pub primary_objectives: Vec<String>,
    pub secondary_objectives: Vec<String>,
    pub exploratory_objectives: Option<Vec<String>>,
    pub primary_endpoints: Vec<String>,
    pub secondary_endpoints: Vec<String>,
    pub exploratory_endpoints: Option<Vec<String>>,

    // Study design
    pub design: String,
    pub arms: Vec<StudyArm>,
    pub blinding: String,
    pub randomization: String,
    pub study_duration: DurationValue,

    // Population
    pub target_population: String,
    pub sample_size: u64,
    pub inclusion_criteria: Vec<String>,
    pub exclusion_criteria: Vec<String>,

    // Treatments
    pub investigational_product: String,
    pub comparator: Option<String>,
    pub dosage_and_administration: Vec<DosageInfo>,

    // Assessments
    pub efficacy_assessments: Vec<String>,
    pub safety_assessments: Vec<String>,
    pub pharmacokinetic_assessments: Option<Vec<String>>,
    pub immunogenicity_markers: Option<Vec<String>>,

    // Statistical considerations
    pub sample_size_justification: String,
    pub statistical_analysis_plan: String,
    pub interim_analysis: Option<String>,

    // Ethics & compliance
    pub ethical_considerations: String,
    pub data_monitoring: String,

    // Timeline
    pub estimated_study_start_date: String,
    pub estimated_study_completion_date: String,
    pub follow_up_duration: DurationValue,
}

impl ProtocolSynopsis {
    /// Number of fields carrying a non-empty value.
    ///
    /// Used for progress reporting: a chunk that fills nothing is usually a
    /// boilerplate section (signature pages, appendices).
    pub fn filled_fields(&self) -> usize {
        fn s(v: &str) -> usize {
            usize::from(!v.trim().is_empty())
        }
        fn l<T>(v: &[T]) -> usize {
            usize::from(!v.is_empty())
        }
        fn ol(v: &Option<Vec<String>>) -> usize {
            v.as_deref().map_or(0, l)
        }
        fn os(v: &Option<String>) -> usize {
            v.as_deref().map_or(0, s)
        }

        s(&self.protocol_title)
            + s(&self.short_title)
            + s(&self.protocol_number)
            + s(&self.version_and_date)
            + s(&self.study_phase)
            + s(&self.indication)
            + s(&self.sponsor)
            + s(&self.background)
            + s(&self.mechanism_of_action)
            + s(&self.justification_for_study_design)
            + l(&self.primary_objectives)
            + l(&self.secondary_objectives)
            + ol(&self.exploratory_objectives)
            + l(&self.primary_endpoints)
            + l(&self.secondary_endpoints)
            + ol(&self.exploratory_endpoints)
            + s(&self.design)
            + l(&self.arms)
            + s(&self.blinding)
            + s(&self.randomization)
            + usize::from(!self.study_duration.is_blank())
            + s(&self.target_population)
            + usize::from(self.sample_size > 0)
            + l(&self.inclusion_criteria)
            + l(&self.exclusion_criteria)
            + s(&self.investigational_product)
            + os(&self.comparator)
            + l(&self.dosage_and_administration)
            + l(&self.efficacy_assessments)
            + l(&self.safety_assessments)
            + ol(&self.pharmacokinetic_assessments)
            + ol(&self.immunogenicity_markers)
            + s(&self.sample_size_justification)
            + s(&self.statistical_analysis_plan)
            + os(&self.interim_analysis)
            + s(&self.ethical_considerations)
            + s(&self.data_monitoring)
            + s(&self.estimated_study_start_date)
            + s(&self.estimated_study_completion_date)
            + usize::from(!self.follow_up_duration.is_blank())
    }
}
