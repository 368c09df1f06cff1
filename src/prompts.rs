//! Prompts for LLM-based synopsis extraction.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: the JSON schema the model is shown and the
//!    field tables in [`crate::schema`] must agree; keeping the prompt in one
//!    place makes that drift easy to test for.
//!
//! 2. **Testability**: unit tests can inspect prompts directly without
//!    calling a real model.
//!
//! Callers can override the system prompt via
//! [`crate::config::ExtractionConfig::system_prompt`]; the constant here is
//! used only when no override is provided.

/// Default system prompt: role, ICH framing and the exact reply schema.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a clinical research expert tasked with extracting key information from a clinical trial protocol to create a synopsis.
The input text is a section of a larger protocol document. Extract relevant information following ICH guidelines.
Focus on maintaining technical accuracy and precision. Return the information in a JSON format exactly matching the provided schema.

Required JSON Schema:
{
    "protocol_title": "string",
    "short_title": "string",
    "protocol_number": "string",
    "version_and_date": "string",
    "study_phase": "string",
    "indication": "string",
    "sponsor": "string",
    "background": "string",
    "mechanism_of_action": "string",
    "justification_for_study_design": "string",
    "primary_objectives": ["string"],
    "secondary_objectives": ["string"],
    "exploratory_objectives": ["string"],
    "primary_endpoints": ["string"],
    "secondary_endpoints": ["string"],
    "exploratory_endpoints": ["string"],
    "design": "string",
    "arms": [
        {
            "arm_name": "string",
            "treatment_description": "string",
            "dosing_schedule": "string"
        }
    ],
    "blinding": "string",
    "randomization": "string",
    "study_duration": "string",
    "target_population": "string",
    "sample_size": 0,
    "inclusion_criteria": ["string"],
    "exclusion_criteria": ["string"],
    "investigational_product": "string",
    "comparator": "string",
    "dosage_and_administration": [
        {
            "drug_name": "string",
            "dose": "string",
            "frequency": "string",
            "route_of_administration": "string"
        }
    ],
    "efficacy_assessments": ["string"],
    "safety_assessments": ["string"],
    "pharmacokinetic_assessments": ["string"],
    "immunogenicity_markers": ["string"],
    "sample_size_justification": "string",
    "statistical_analysis_plan": "string",
    "interim_analysis": "string",
    "ethical_considerations": "string",
    "data_monitoring": "string",
    "estimated_study_start_date": "string",
    "estimated_study_completion_date": "string",
    "follow_up_duration": "string"
}

IMPORTANT: You must include ALL fields in your response, even if empty.
- Use empty string "" for missing string fields
- Use empty array [] for missing array fields (NEVER use empty string for array fields)
- Use 0 for missing numeric fields
For sponsor information, extract only the name as a string, not the full details."#;

/// Build the user message for one chunk of the protocol.
///
/// `part` is 1-indexed.
pub fn chunk_user_prompt(chunk: &str, part: usize, total: usize) -> String {
    format!(
        "Process part {part}/{total} of the protocol document.\n\
Extract all relevant information into a structured format following ICH guidelines and the exact schema provided.\n\
You MUST include ALL fields in the output JSON, even if empty.\n\
IMPORTANT: Array fields must always be arrays, even if empty (use [] not \"\").\n\
\n\
Text to process:\n\
{chunk}\n\
\n\
Return ONLY a valid JSON object matching the schema exactly. Do not include any other text or explanation."
    )
}
