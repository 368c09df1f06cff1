//! Human-readable Markdown rendering of a synopsis.
//!
//! The layout follows the section order sponsors use for the synopsis at the
//! front of an ICH E6 protocol, so the report can be pasted into a protocol
//! template with minimal editing. Optional sections are left out when the
//! protocol has nothing to say about them.

use crate::synopsis::ProtocolSynopsis;
use std::fmt::Write;

/// Render `synopsis` as a Markdown document ending in a single newline.
pub fn render_markdown(synopsis: &ProtocolSynopsis) -> String {
    let s = synopsis;
    let mut md = String::with_capacity(4096);
    md.push_str("# PROTOCOL SYNOPSIS\n");

    section(&mut md, "Basic Study Information");
    labelled(&mut md, "Protocol Title", &s.protocol_title);
    labelled(&mut md, "Short Title", &s.short_title);
    labelled(&mut md, "Protocol Number", &s.protocol_number);
    labelled(&mut md, "Version and Date", &s.version_and_date);
    labelled(&mut md, "Study Phase", &s.study_phase);
    labelled(&mut md, "Indication", &s.indication);
    labelled(&mut md, "Sponsor", &s.sponsor);

    section(&mut md, "Study Rationale");
    paragraph(&mut md, "Background", &s.background);
    paragraph(&mut md, "Mechanism of Action", &s.mechanism_of_action);
    paragraph(
        &mut md,
        "Justification for Study Design",
        &s.justification_for_study_design,
    );

    section(&mut md, "Objectives & Endpoints");
    bullets(&mut md, "Primary Objectives", &s.primary_objectives);
    bullets(&mut md, "Secondary Objectives", &s.secondary_objectives);
    optional_bullets(&mut md, "Exploratory Objectives", &s.exploratory_objectives);
    bullets(&mut md, "Primary Endpoints", &s.primary_endpoints);
    bullets(&mut md, "Secondary Endpoints", &s.secondary_endpoints);
    optional_bullets(&mut md, "Exploratory Endpoints", &s.exploratory_endpoints);

    section(&mut md, "Study Design");
    labelled(&mut md, "Design", &s.design);
    labelled(&mut md, "Blinding", &s.blinding);
    labelled(&mut md, "Randomization", &s.randomization);
    labelled(&mut md, "Study Duration", &s.study_duration.to_string());
    subheading(&mut md, "Study Arms");
    table(
        &mut md,
        &["Arm Name", "Treatment Description", "Dosing Schedule"],
        s.arms.iter().map(|a| {
            vec![
                a.arm_name.as_str(),
                a.treatment_description.as_str(),
                a.dosing_schedule.as_str(),
            ]
        }),
    );

    section(&mut md, "Population");
    labelled(&mut md, "Target Population", &s.target_population);
    labelled(&mut md, "Sample Size", &s.sample_size.to_string());
    bullets(&mut md, "Inclusion Criteria", &s.inclusion_criteria);
    bullets(&mut md, "Exclusion Criteria", &s.exclusion_criteria);

    section(&mut md, "Treatments");
    labelled(&mut md, "Investigational Product", &s.investigational_product);
    if let Some(c) = non_blank(&s.comparator) {
        labelled(&mut md, "Comparator", c);
    }
    subheading(&mut md, "Dosage and Administration");
    table(
        &mut md,
        &["Drug Name", "Dose", "Frequency", "Route of Administration"],
        s.dosage_and_administration.iter().map(|d| {
            vec![
                d.drug_name.as_str(),
                d.dose.as_str(),
                d.frequency.as_str(),
                d.route_of_administration.as_str(),
            ]
        }),
    );

    section(&mut md, "Assessments");
    bullets(&mut md, "Efficacy Assessments", &s.efficacy_assessments);
    bullets(&mut md, "Safety Assessments", &s.safety_assessments);
    optional_bullets(
        &mut md,
        "Pharmacokinetic Assessments",
        &s.pharmacokinetic_assessments,
    );
    optional_bullets(&mut md, "Immunogenicity Markers", &s.immunogenicity_markers);

    section(&mut md, "Statistical Considerations");
    labelled(&mut md, "Sample Size Justification", &s.sample_size_justification);
    labelled(&mut md, "Statistical Analysis Plan", &s.statistical_analysis_plan);
    if let Some(i) = non_blank(&s.interim_analysis) {
        labelled(&mut md, "Interim Analysis", i);
    }

    section(&mut md, "Ethics & Compliance");
    labelled(&mut md, "Ethical Considerations", &s.ethical_considerations);
    labelled(&mut md, "Data Monitoring", &s.data_monitoring);

    section(&mut md, "Timeline");
    if !s.estimated_study_start_date.trim().is_empty() {
        labelled(&mut md, "Estimated Study Start Date", &s.estimated_study_start_date);
    }
    if !s.estimated_study_completion_date.trim().is_empty() {
        labelled(
            &mut md,
            "Estimated Study Completion Date",
            &s.estimated_study_completion_date,
        );
    }
    labelled(&mut md, "Follow-up Duration", &s.follow_up_duration.to_string());

    md
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.trim().is_empty())
}

fn section(md: &mut String, title: &str) {
    let _ = write!(md, "\n## {title}\n\n");
}

fn subheading(md: &mut String, title: &str) {
    let _ = write!(md, "\n### {title}\n\n");
}

fn labelled(md: &mut String, label: &str, value: &str) {
    let _ = writeln!(md, "**{label}:** {}  ", value.trim());
}

fn paragraph(md: &mut String, label: &str, text: &str) {
    subheading(md, label);
    let _ = writeln!(md, "{}", text.trim());
}

fn bullets(md: &mut String, label: &str, items: &[String]) {
    subheading(md, label);
    if items.is_empty() {
        md.push_str("_None specified._\n");
        return;
    }
    for item in items {
        let _ = writeln!(md, "- {}", item.trim().replace('\n', " "));
    }
}

fn optional_bullets(md: &mut String, label: &str, items: &Option<Vec<String>>) {
    if let Some(items) = items.as_deref().filter(|i| !i.is_empty()) {
        bullets(md, label, items);
    }
}

fn table<'a>(md: &mut String, headers: &[&str], rows: impl Iterator<Item = Vec<&'a str>>) {
    let _ = writeln!(md, "| {} |", headers.join(" | "));
    let _ = writeln!(
        md,
        "|{}",
        headers.iter().map(|_| " --- |").collect::<String>()
    );
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        let _ = writeln!(md, "| {} |", cells.join(" | "));
    }
}

/// Pipes would end the cell; newlines would end the row.
fn escape_cell(cell: &str) -> String {
    cell.trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}
