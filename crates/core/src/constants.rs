//! Constants used throughout the labflow core crate.
//!
//! Segment names, placeholder values and environment variable names live here so the mapper,
//! bundle builder and configuration layer agree on them.

/// Patient identifier used when the message carries none.
pub const DEFAULT_PATIENT_ID: &str = "patient-1";

/// Bundle code used for an observation with neither a code nor a display.
pub const UNKNOWN_CODE: &str = "UNKNOWN";

/// Prefix of sequential observation ids (`obs-1`, `obs-2`, ...).
pub const OBSERVATION_ID_PREFIX: &str = "obs-";

/// Patient identification segment.
pub const PATIENT_SEGMENT: &str = "PID";

/// Observation result segment.
pub const RESULT_SEGMENT: &str = "OBX";

/// Free-text note segment.
pub const NOTE_SEGMENT: &str = "NTE";

/// Value types whose results are narrative text and worth enriching downstream.
pub const TEXT_VALUE_TYPES: [&str; 4] = ["TX", "FT", "ED", "ST"];

/// Summary used when no observation has a code or display.
pub const NO_OBSERVATIONS_SUMMARY: &str =
    "No clinically meaningful observation values were parsed from the message.";

/// Environment variable naming a YAML code table that replaces the built-in one.
pub const CODE_TABLE_ENV: &str = "LABFLOW_CODE_TABLE";

/// Environment variable carrying the default enrichment request flag.
pub const ENRICH_ENV: &str = "LABFLOW_ENRICH";
