//! Deterministic clinical summary and enrichment triage.

use crate::constants::{NO_OBSERVATIONS_SUMMARY, TEXT_VALUE_TYPES};
use crate::model::Observation;

/// One sentence per observation that has a code or display, joined by single spaces.
///
/// Flags with a phrase read `"{label} ({code}) is {phrase} at {value}{ unit}."`, everything
/// else `"{label} ({code}) has a value of {value}{ unit}."`.
pub fn clinical_summary(observations: &[Observation]) -> String {
    let sentences: Vec<String> = observations.iter().filter_map(sentence).collect();
    if sentences.is_empty() {
        return NO_OBSERVATIONS_SUMMARY.to_string();
    }
    sentences.join(" ")
}

fn sentence(obs: &Observation) -> Option<String> {
    let code = obs.code.trim();
    let display = obs.display.trim();
    if code.is_empty() && display.is_empty() {
        return None;
    }

    let label = if display.is_empty() { code } else { display };
    let value = if obs.value.is_empty() {
        "no recorded value".to_string()
    } else {
        obs.value.to_string()
    };
    let unit = match obs.unit.trim() {
        "" => String::new(),
        unit => format!(" {unit}"),
    };

    Some(match obs.flag.phrase() {
        Some(phrase) => format!("{label} ({code}) is {phrase} at {value}{unit}."),
        None => format!("{label} ({code}) has a value of {value}{unit}."),
    })
}

/// `true` when any observation carries a non-blank note or a narrative value type.
///
/// The core never enriches; callers use this to decide whether to.
pub fn requires_enrichment(observations: &[Observation]) -> bool {
    observations.iter().any(|obs| {
        obs.notes.iter().any(|n| !n.trim().is_empty())
            || TEXT_VALUE_TYPES.contains(&obs.value_type.trim().to_ascii_uppercase().as_str())
    })
}
