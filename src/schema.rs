//! Validate a model reply and turn it into a [`ProtocolSynopsis`].
//!
//! The model is instructed to return every field of the schema, using `""`,
//! `[]` or `0` for information the chunk does not contain. In practice replies
//! drift from that contract in two different ways, and the two are treated
//! differently:
//!
//! * **Shape drift** is repaired. A scalar where a list belongs becomes a
//!   one-element list, `null` or `""` where a list belongs becomes `[]`,
//!   `null` in a string field (or list item) becomes `""`, numbers in string
//!   fields are stringified and `"1,200"` is accepted as a sample size.
//!   String values themselves are kept exactly as sent.
//! * **Missing or unusable data** is rejected with a [`SchemaError`] naming
//!   the field: an absent required key, an object where a string belongs, a
//!   sample size of `"many"`.
//!
//! Keys outside the schema are ignored.

use crate::error::SchemaError;
use crate::pipeline::postprocess::isolate_json;
use crate::synopsis::{DosageInfo, DurationValue, ProtocolSynopsis, StudyArm};
use serde_json::{Map, Value};
use tracing::debug;

/// Keys every reply must carry, in schema order.
pub const REQUIRED_FIELDS: &[&str] = &[
    "protocol_title",
    "short_title",
    "protocol_number",
    "version_and_date",
    "study_phase",
    "indication",
    "sponsor",
    "background",
    "mechanism_of_action",
    "justification_for_study_design",
    "primary_objectives",
    "secondary_objectives",
    "primary_endpoints",
    "secondary_endpoints",
    "design",
    "arms",
    "blinding",
    "randomization",
    "study_duration",
    "target_population",
    "sample_size",
    "inclusion_criteria",
    "exclusion_criteria",
    "investigational_product",
    "dosage_and_administration",
    "efficacy_assessments",
    "safety_assessments",
    "sample_size_justification",
    "statistical_analysis_plan",
    "ethical_considerations",
    "data_monitoring",
    "estimated_study_start_date",
    "estimated_study_completion_date",
    "follow_up_duration",
];

/// Keys that may be absent or `null`.
pub const OPTIONAL_FIELDS: &[&str] = &[
    "exploratory_objectives",
    "exploratory_endpoints",
    "comparator",
    "pharmacokinetic_assessments",
    "immunogenicity_markers",
    "interim_analysis",
];

const ARM_FIELDS: &[&str] = &["arm_name", "treatment_description", "dosing_schedule"];

const DOSAGE_FIELDS: &[&str] = &["drug_name", "dose", "frequency", "route_of_administration"];

/// Parse a raw model reply into a synopsis.
///
/// Code fences and surrounding prose are stripped first (see
/// [`isolate_json`]). Never panics: every malformed input maps to a
/// [`SchemaError`].
///
/// # Example
/// ```rust
/// use edgequake_synopsis::{parse_synopsis, SchemaError};
///
/// let err = parse_synopsis("The protocol could not be summarised.").unwrap_err();
/// assert!(matches!(err, SchemaError::NotJson { .. }));
/// ```
pub fn parse_synopsis(raw: &str) -> Result<ProtocolSynopsis, SchemaError> {
    let candidate = isolate_json(raw);
    let value: Value = serde_json::from_str(&candidate).map_err(|e| SchemaError::NotJson {
        detail: e.to_string(),
    })?;
    synopsis_from_value(&value)
}

/// Validate an already-parsed JSON value.
pub fn synopsis_from_value(value: &Value) -> Result<ProtocolSynopsis, SchemaError> {
    let obj = value.as_object().ok_or_else(|| SchemaError::NotAnObject {
        found: describe(value),
    })?;

    let unknown: Vec<&str> = obj
        .keys()
        .map(String::as_str)
        .filter(|k| !REQUIRED_FIELDS.contains(k) && !OPTIONAL_FIELDS.contains(k))
        .collect();
    if !unknown.is_empty() {
        debug!("Ignoring keys outside the synopsis schema: {:?}", unknown);
    }

    let r = Fields::root(obj);
    r.require_all(REQUIRED_FIELDS)?;

    Ok(ProtocolSynopsis {
        protocol_title: r.string("protocol_title")?,
        short_title: r.string("short_title")?,
        protocol_number: r.string("protocol_number")?,
        version_and_date: r.string("version_and_date")?,
        study_phase: r.string("study_phase")?,
        indication: r.string("indication")?,
        sponsor: r.string("sponsor")?,
        background: r.string("background")?,
        mechanism_of_action: r.string("mechanism_of_action")?,
        justification_for_study_design: r.string("justification_for_study_design")?,
        primary_objectives: r.string_list("primary_objectives")?,
        secondary_objectives: r.string_list("secondary_objectives")?,
        exploratory_objectives: r.opt_string_list("exploratory_objectives")?,
        primary_endpoints: r.string_list("primary_endpoints")?,
        secondary_endpoints: r.string_list("secondary_endpoints")?,
        exploratory_endpoints: r.opt_string_list("exploratory_endpoints")?,
        design: r.string("design")?,
        arms: r.objects("arms", ARM_FIELDS, |arm| {
            Ok(StudyArm {
                arm_name: arm.string("arm_name")?,
                treatment_description: arm.string("treatment_description")?,
                dosing_schedule: arm.string("dosing_schedule")?,
            })
        })?,
        blinding: r.string("blinding")?,
        randomization: r.string("randomization")?,
        study_duration: r.duration("study_duration")?,
        target_population: r.string("target_population")?,
        sample_size: r.count("sample_size")?,
        inclusion_criteria: r.string_list("inclusion_criteria")?,
        exclusion_criteria: r.string_list("exclusion_criteria")?,
        investigational_product: r.string("investigational_product")?,
        comparator: r.opt_string("comparator")?,
        dosage_and_administration: r.objects("dosage_and_administration", DOSAGE_FIELDS, |d| {
            Ok(DosageInfo {
                drug_name: d.string("drug_name")?,
                dose: d.string("dose")?,
                frequency: d.string("frequency")?,
                route_of_administration: d.string("route_of_administration")?,
            })
        })?,
        efficacy_assessments: r.string_list("efficacy_assessments")?,
        safety_assessments: r.string_list("safety_assessments")?,
        pharmacokinetic_assessments: r.opt_string_list("pharmacokinetic_assessments")?,
        immunogenicity_markers: r.opt_string_list("immunogenicity_markers")?,
        sample_size_justification: r.string("sample_size_justification")?,
        statistical_analysis_plan: r.string("statistical_analysis_plan")?,
        interim_analysis: r.opt_string("interim_analysis")?,
        ethical_considerations: r.string("ethical_considerations")?,
        data_monitoring: r.string("data_monitoring")?,
        estimated_study_start_date: r.string("estimated_study_start_date")?,
        estimated_study_completion_date: r.string("estimated_study_completion_date")?,
        follow_up_duration: r.duration("follow_up_duration")?,
    })
}

// ── Field reader ─────────────────────────────────────────────────────────────

/// A JSON object plus the path that leads to it, so errors can name
/// `arms[2].dose` rather than just `dose`.
struct Fields<'a> {
    obj: &'a Map<String, Value>,
    prefix: String,
}

impl<'a> Fields<'a> {
    fn root(obj: &'a Map<String, Value>) -> Self {
        Self {
            obj,
            prefix: String::new(),
        }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    fn require_all(&self, keys: &[&str]) -> Result<(), SchemaError> {
        match keys.iter().find(|k| !self.obj.contains_key(**k)) {
            Some(missing) => Err(SchemaError::MissingField {
                field: self.path(missing),
            }),
            None => Ok(()),
        }
    }

    fn required(&self, key: &str) -> Result<&'a Value, SchemaError> {
        self.obj.get(key).ok_or_else(|| SchemaError::MissingField {
            field: self.path(key),
        })
    }

    /// `None` for absent keys and explicit `null`.
    fn optional(&self, key: &str) -> Option<&'a Value> {
        self.obj.get(key).filter(|v| !v.is_null())
    }

    fn string(&self, key: &str) -> Result<String, SchemaError> {
        coerce_string(self.required(key)?, &self.path(key))
    }

    fn opt_string(&self, key: &str) -> Result<Option<String>, SchemaError> {
        self.optional(key)
            .map(|v| coerce_string(v, &self.path(key)))
            .transpose()
    }

    fn string_list(&self, key: &str) -> Result<Vec<String>, SchemaError> {
        coerce_string_list(self.required(key)?, &self.path(key))
    }

    fn opt_string_list(&self, key: &str) -> Result<Option<Vec<String>>, SchemaError> {
        self.optional(key)
            .map(|v| coerce_string_list(v, &self.path(key)))
            .transpose()
    }

    fn count(&self, key: &str) -> Result<u64, SchemaError> {
        coerce_count(self.required(key)?, &self.path(key))
    }

    fn duration(&self, key: &str) -> Result<DurationValue, SchemaError> {
        coerce_duration(self.required(key)?, &self.path(key))
    }

    /// A list of nested objects, each validated by `build`.
    fn objects<T>(
        &self,
        key: &str,
        item_fields: &[&str],
        build: impl Fn(&Fields<'a>) -> Result<T, SchemaError>,
    ) -> Result<Vec<T>, SchemaError> {
        let path = self.path(key);
        let value = self.required(key)?;

        let items: Vec<&'a Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![value],
            Value::Null => Vec::new(),
            Value::String(s) if s.trim().is_empty() => Vec::new(),
            other => {
                return Err(SchemaError::InvalidField {
                    field: path,
                    expected: "a list of objects",
                    found: describe(other),
                })
            }
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let item_path = format!("{path}[{i}]");
            let obj = item.as_object().ok_or_else(|| SchemaError::InvalidField {
                field: item_path.clone(),
                expected: "an object",
                found: describe(item),
            })?;
            let nested = Fields {
                obj,
                prefix: item_path,
            };
            nested.require_all(item_fields)?;
            out.push(build(&nested)?);
        }
        Ok(out)
    }
}

// ── Coercions ────────────────────────────────────────────────────────────────

fn coerce_string(value: &Value, field: &str) -> Result<String, SchemaError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(SchemaError::InvalidField {
            field: field.to_string(),
            expected: "a string",
            found: describe(other),
        }),
    }
}

fn coerce_string_list(value: &Value, field: &str) -> Result<Vec<String>, SchemaError> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| coerce_string(item, &format!("{field}[{i}]")))
            .collect(),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Number(n) => Ok(vec![n.to_string()]),
        Value::Null => Ok(Vec::new()),
        other => Err(SchemaError::InvalidField {
            field: field.to_string(),
            expected: "a list of strings",
            found: describe(other),
        }),
    }
}

fn coerce_count(value: &Value, field: &str) -> Result<u64, SchemaError> {
    let invalid = || SchemaError::InvalidField {
        field: field.to_string(),
        expected: "a non-negative integer",
        found: describe(value),
    };

    match value {
        Value::Null => Ok(0),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(u)
            } else {
                match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
                    _ => Err(invalid()),
                }
            }
        }
        Value::String(s) => {
            let digits: String = s
                .chars()
                .filter(|c| !matches!(c, ',' | '_' | ' ' | '\u{a0}'))
                .collect();
            if digits.is_empty() {
                Ok(0)
            } else {
                digits.parse::<u64>().map_err(|_| invalid())
            }
        }
        _ => Err(invalid()),
    }
}

fn coerce_duration(value: &Value, field: &str) -> Result<DurationValue, SchemaError> {
    match value {
        Value::String(s) => Ok(DurationValue::Text(s.clone())),
        Value::Null => Ok(DurationValue::default()),
        Value::Number(n) => Ok(match n.as_i64() {
            Some(i) => DurationValue::Number(i),
            None => DurationValue::Text(n.to_string()),
        }),
        other => Err(SchemaError::InvalidField {
            field: field.to_string(),
            expected: "a string or an integer",
            found: describe(other),
        }),
    }
}

/// Short human description of a JSON value for error messages.
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("a boolean ({b})"),
        Value::Number(n) => format!("a number ({n})"),
        Value::String(s) => {
            let preview: String = s.chars().take(40).collect();
            if preview.len() < s.len() {
                format!("a string (\"{preview}…\")")
            } else {
                format!("a string (\"{preview}\")")
            }
        }
        Value::Array(items) => format!("an array of {} items", items.len()),
        Value::Object(_) => "an object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A reply with every field present and well-formed.
    fn full_reply() -> Value {
        json!({
            "protocol_title": "A Randomised, Double-Blind Study of Examplumab in Moderate Asthma",
            "short_title": "EXAMPLE-1",
            "protocol_number": "EX-2024-001",
            "version_and_date": "v3.0, 12 March 2024",
            "study_phase": "Phase 2",
            "indication": "Moderate persistent asthma",
            "sponsor": "Example Pharma Ltd",
            "background": "Asthma affects 300 million people.",
            "mechanism_of_action": "Anti-IL-5 monoclonal antibody",
            "justification_for_study_design": "Placebo control is standard for add-on therapy.",
            "primary_objectives": ["Assess efficacy on FEV1"],
            "secondary_objectives": ["Assess safety", "Assess exacerbation rate"],
            "exploratory_objectives": ["Biomarker response"],
            "primary_endpoints": ["Change from baseline in FEV1 at week 24"],
            "secondary_endpoints": ["Annualised exacerbation rate"],
            "exploratory_endpoints": null,
            "design": "Multicentre, randomised, double-blind, placebo-controlled",
            "arms": [
                {"arm_name": "Examplumab", "treatment_description": "100 mg SC", "dosing_schedule": "Q4W"},
                {"arm_name": "Placebo", "treatment_description": "Matching placebo SC", "dosing_schedule": "Q4W"}
            ],
            "blinding": "Double-blind",
            "randomization": "1:1, stratified by region",
            "study_duration": "52 weeks",
            "target_population": "Adults 18-75 with moderate asthma",
            "sample_size": 240,
            "inclusion_criteria": ["Age 18-75", "FEV1 40-80% predicted"],
            "exclusion_criteria": ["Current smoker"],
            "investigational_product": "Examplumab",
            "comparator": "Placebo",
            "dosage_and_administration": [
                {"drug_name": "Examplumab", "dose": "100 mg", "frequency": "Every 4 weeks", "route_of_administration": "Subcutaneous"}
            ],
            "efficacy_assessments": ["Spirometry"],
            "safety_assessments": ["Adverse events", "Laboratory tests"],
            "pharmacokinetic_assessments": ["Trough concentration"],
            "immunogenicity_markers": ["Anti-drug antibodies"],
            "sample_size_justification": "90% power to detect 150 mL difference",
            "statistical_analysis_plan": "MMRM on change from baseline",
            "interim_analysis": "",
            "ethical_considerations": "Conducted per ICH GCP",
            "data_monitoring": "Independent DMC",
            "estimated_study_start_date": "2024-06",
            "estimated_study_completion_date": "2026-03",
            "follow_up_duration": 12
        })
    }

    fn without(key: &str) -> Value {
        let mut v = full_reply();
        v.as_object_mut().unwrap().remove(key);
        v
    }

    fn with(key: &str, value: Value) -> Value {
        let mut v = full_reply();
        v[key] = value;
        v
    }

    #[test]
    fn full_reply_populates_every_field() {
        let s = parse_synopsis(&full_reply().to_string()).unwrap();
        assert_eq!(s.short_title, "EXAMPLE-1");
        assert_eq!(s.study_phase, "Phase 2");
        assert_eq!(s.secondary_objectives.len(), 2);
        assert_eq!(s.exploratory_objectives, Some(vec!["Biomarker response".to_string()]));
        assert_eq!(s.exploratory_endpoints, None);
        assert_eq!(s.arms.len(), 2);
        assert_eq!(s.arms[1].arm_name, "Placebo");
        assert_eq!(s.arms[1].dosing_schedule, "Q4W");
        assert_eq!(s.sample_size, 240);
        assert_eq!(s.study_duration, DurationValue::Text("52 weeks".into()));
        assert_eq!(s.follow_up_duration, DurationValue::Number(12));
        assert_eq!(s.comparator.as_deref(), Some("Placebo"));
        assert_eq!(s.interim_analysis.as_deref(), Some(""));
        assert_eq!(s.dosage_and_administration[0].route_of_administration, "Subcutaneous");
        assert_eq!(s.immunogenicity_markers, Some(vec!["Anti-drug antibodies".to_string()]));
    }

    #[test]
    fn every_required_field_is_reported_by_name_when_missing() {
        for field in REQUIRED_FIELDS {
            let err = synopsis_from_value(&without(field)).unwrap_err();
            assert_eq!(
                err,
                SchemaError::MissingField {
                    field: field.to_string()
                },
                "removing {field}"
            );
        }
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let mut v = full_reply();
        for field in OPTIONAL_FIELDS {
            v.as_object_mut().unwrap().remove(*field);
        }
        let s = synopsis_from_value(&v).unwrap();
        assert_eq!(s.comparator, None);
        assert_eq!(s.pharmacokinetic_assessments, None);
        assert_eq!(s.interim_analysis, None);
    }

    #[test]
    fn nested_missing_field_uses_indexed_path() {
        let v = with(
            "arms",
            json!([
                {"arm_name": "A", "treatment_description": "x", "dosing_schedule": "QD"},
                {"arm_name": "B", "treatment_description": "y"}
            ]),
        );
        let err = synopsis_from_value(&v).unwrap_err();
        assert_eq!(err.field(), Some("arms[1].dosing_schedule"));
    }

    #[test]
    fn non_json_fails_cleanly() {
        for reply in ["", "not json at all", "{\"protocol_title\": ", "```json\n```"] {
            let err = parse_synopsis(reply).unwrap_err();
            assert!(matches!(err, SchemaError::NotJson { .. }), "{reply:?} → {err:?}");
        }
    }

    #[test]
    fn top_level_array_is_rejected() {
        let err = parse_synopsis("[1, 2]").unwrap_err();
        assert_eq!(
            err,
            SchemaError::NotAnObject {
                found: "an array of 2 items".into()
            }
        );
    }

    #[test]
    fn array_wrapping_a_full_synopsis_is_rejected() {
        for reply in [format!("[{}]", full_reply()), format!("```json\n[{}]\n```", full_reply())] {
            let err = parse_synopsis(&reply).unwrap_err();
            assert_eq!(
                err,
                SchemaError::NotAnObject {
                    found: "an array of 1 items".into()
                }
            );
        }
    }

    #[test]
    fn fenced_reply_is_accepted() {
        let reply = format!("```json\n{}\n```", full_reply());
        assert_eq!(parse_synopsis(&reply).unwrap().sample_size, 240);
    }

    #[test]
    fn scalar_in_list_field_becomes_single_item() {
        let s = synopsis_from_value(&with("primary_endpoints", json!("FEV1 at week 24"))).unwrap();
        assert_eq!(s.primary_endpoints, vec!["FEV1 at week 24"]);
    }

    #[test]
    fn empty_or_null_list_field_becomes_empty() {
        let s = synopsis_from_value(&with("inclusion_criteria", json!(""))).unwrap();
        assert!(s.inclusion_criteria.is_empty());
        let s = synopsis_from_value(&with("exclusion_criteria", Value::Null)).unwrap();
        assert!(s.exclusion_criteria.is_empty());
    }

    #[test]
    fn single_arm_object_becomes_list() {
        let s = synopsis_from_value(&with(
            "arms",
            json!({"arm_name": "Open label", "treatment_description": "Drug", "dosing_schedule": "BID"}),
        ))
        .unwrap();
        assert_eq!(s.arms.len(), 1);
        assert_eq!(s.arms[0].dosing_schedule, "BID");
    }

    #[test]
    fn null_string_becomes_empty_and_numbers_are_stringified() {
        let s = synopsis_from_value(&with("sponsor", Value::Null)).unwrap();
        assert_eq!(s.sponsor, "");
        let s = synopsis_from_value(&with("protocol_number", json!(20240017))).unwrap();
        assert_eq!(s.protocol_number, "20240017");
    }

    #[test]
    fn object_in_string_field_is_invalid() {
        let err = synopsis_from_value(&with(
            "sponsor",
            json!({"name": "Example Pharma", "address": "London"}),
        ))
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidField {
                field: "sponsor".into(),
                expected: "a string",
                found: "an object".into(),
            }
        );
    }

    #[test]
    fn sample_size_accepts_numeric_forms() {
        for (raw, want) in [
            (json!(120), 120),
            (json!(120.0), 120),
            (json!("1,200"), 1200),
            (json!(""), 0),
            (Value::Null, 0),
        ] {
            let s = synopsis_from_value(&with("sample_size", raw.clone())).unwrap();
            assert_eq!(s.sample_size, want, "input {raw}");
        }
    }

    #[test]
    fn sample_size_rejects_non_numbers() {
        for raw in [json!("approximately 100"), json!(-5), json!(12.5), json!(true)] {
            let err = synopsis_from_value(&with("sample_size", raw.clone())).unwrap_err();
            assert_eq!(err.field(), Some("sample_size"), "input {raw}");
        }
    }

    #[test]
    fn list_item_of_wrong_type_names_index() {
        let err = synopsis_from_value(&with(
            "safety_assessments",
            json!(["AEs", {"type": "labs"}]),
        ))
        .unwrap_err();
        assert_eq!(err.field(), Some("safety_assessments[1]"));
    }

    #[test]
    fn list_items_keep_their_position() {
        let s = synopsis_from_value(&with("efficacy_assessments", json!(["Spirometry", "", null, " ACQ-5 "])))
            .unwrap();
        assert_eq!(s.efficacy_assessments, vec!["Spirometry", "", "", " ACQ-5 "]);
    }

    #[test]
    fn string_values_come_back_byte_for_byte() {
        let mut v = with("primary_objectives", json!(["  Evaluate FEV1  ", "", null]));
        v["indication"] = json!("  asthma\u{200B}zw ");
        v["sponsor"] = json!("\u{0915}\u{094D}\u{200D}\u{0937} Labs\n");
        v["study_duration"] = json!(" 52 weeks ");
        let reply = format!("\u{FEFF}```json\n{v}\n```");

        let s = parse_synopsis(&reply).unwrap();
        assert_eq!(s.primary_objectives, vec!["  Evaluate FEV1  ", "", ""]);
        assert_eq!(s.indication, "  asthma\u{200B}zw ");
        assert_eq!(s.sponsor, "\u{0915}\u{094D}\u{200D}\u{0937} Labs\n");
        assert_eq!(s.study_duration, DurationValue::Text(" 52 weeks ".into()));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let s = synopsis_from_value(&with("notes", json!("extra"))).unwrap();
        assert_eq!(s.protocol_number, "EX-2024-001");
    }

    #[test]
    fn boolean_duration_is_invalid() {
        let err = synopsis_from_value(&with("study_duration", json!(false))).unwrap_err();
        assert_eq!(err.field(), Some("study_duration"));
    }
}
