//! Fold per-chunk synopses into one document-level synopsis.
//!
//! Each chunk only sees part of the protocol, so each reply is a partial
//! synopsis padded with empty values. Merging keeps the first non-empty
//! value seen for scalar fields (title pages and synopsis tables come first
//! in ICH-style protocols) and accumulates list fields across chunks.
//!
//! | Field kind | Rule |
//! |------------|------|
//! | string, optional string, duration | first non-empty wins |
//! | `sample_size` | first non-zero wins |
//! | string list | union, first-seen order, exact duplicates dropped |
//! | arms / dosage | append entries not already present |

use crate::synopsis::{DurationValue, ProtocolSynopsis};

/// Merge `next` into `base` in place.
pub fn merge_synopsis(base: &mut ProtocolSynopsis, next: ProtocolSynopsis) {
    fill(&mut base.protocol_title, next.protocol_title);
    fill(&mut base.short_title, next.short_title);
    fill(&mut base.protocol_number, next.protocol_number);
    fill(&mut base.version_and_date, next.version_and_date);
    fill(&mut base.study_phase, next.study_phase);
    fill(&mut base.indication, next.indication);
    fill(&mut base.sponsor, next.sponsor);

    fill(&mut base.background, next.background);
    fill(&mut base.mechanism_of_action, next.mechanism_of_action);
    fill(
        &mut base.justification_for_study_design,
        next.justification_for_study_design,
    );

    union(&mut base.primary_objectives, next.primary_objectives);
    union(&mut base.secondary_objectives, next.secondary_objectives);
    union_opt(&mut base.exploratory_objectives, next.exploratory_objectives);
    union(&mut base.primary_endpoints, next.primary_endpoints);
    union(&mut base.secondary_endpoints, next.secondary_endpoints);
    union_opt(&mut base.exploratory_endpoints, next.exploratory_endpoints);

    fill(&mut base.design, next.design);
    union(&mut base.arms, next.arms);
    fill(&mut base.blinding, next.blinding);
    fill(&mut base.randomization, next.randomization);
    fill_duration(&mut base.study_duration, next.study_duration);

    fill(&mut base.target_population, next.target_population);
    if base.sample_size == 0 {
        base.sample_size = next.sample_size;
    }
    union(&mut base.inclusion_criteria, next.inclusion_criteria);
    union(&mut base.exclusion_criteria, next.exclusion_criteria);

    fill(&mut base.investigational_product, next.investigational_product);
    fill_opt(&mut base.comparator, next.comparator);
    union(
        &mut base.dosage_and_administration,
        next.dosage_and_administration,
    );

    union(&mut base.efficacy_assessments, next.efficacy_assessments);
    union(&mut base.safety_assessments, next.safety_assessments);
    union_opt(
        &mut base.pharmacokinetic_assessments,
        next.pharmacokinetic_assessments,
    );
    union_opt(&mut base.immunogenicity_markers, next.immunogenicity_markers);

    fill(
        &mut base.sample_size_justification,
        next.sample_size_justification,
    );
    fill(
        &mut base.statistical_analysis_plan,
        next.statistical_analysis_plan,
    );
    fill_opt(&mut base.interim_analysis, next.interim_analysis);

    fill(&mut base.ethical_considerations, next.ethical_considerations);
    fill(&mut base.data_monitoring, next.data_monitoring);

    fill(
        &mut base.estimated_study_start_date,
        next.estimated_study_start_date,
    );
    fill(
        &mut base.estimated_study_completion_date,
        next.estimated_study_completion_date,
    );
    fill_duration(&mut base.follow_up_duration, next.follow_up_duration);
}

/// Merge a sequence of partial synopses, in order.
pub fn merge_all(parts: impl IntoIterator<Item = ProtocolSynopsis>) -> ProtocolSynopsis {
    let mut merged = ProtocolSynopsis::default();
    for part in parts {
        merge_synopsis(&mut merged, part);
    }
    merged
}

fn fill(base: &mut String, next: String) {
    if base.trim().is_empty() && !next.trim().is_empty() {
        *base = next;
    }
}

fn fill_opt(base: &mut Option<String>, next: Option<String>) {
    let base_empty = base.as_deref().is_none_or(|s| s.trim().is_empty());
    match next {
        Some(n) if base_empty && !n.trim().is_empty() => *base = Some(n),
        // Keep an explicit "" over None: the model looked and found nothing.
        Some(n) if base.is_none() => *base = Some(n),
        _ => {}
    }
}

fn fill_duration(base: &mut DurationValue, next: DurationValue) {
    if base.is_blank() && !next.is_blank() {
        *base = next;
    }
}

fn union<T: PartialEq>(base: &mut Vec<T>, next: Vec<T>) {
    for item in next {
        if !base.contains(&item) {
            base.push(item);
        }
    }
}

fn union_opt<T: PartialEq>(base: &mut Option<Vec<T>>, next: Option<Vec<T>>) {
    match (base.as_mut(), next) {
        (Some(b), Some(n)) => union(b, n),
        (None, Some(n)) => *base = Some(n),
        (_, None) => {}
    }
}
