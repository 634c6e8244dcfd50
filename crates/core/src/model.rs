//! Entity model produced by the segment mapper.
//!
//! Entities keep source formats where the data model asks for them (birth date, observation
//! timestamp) and expose the converted forms through methods, so nothing is lost between
//! mapping and bundle construction.

use crate::constants::DEFAULT_PATIENT_ID;
use crate::normalize;
use chrono::NaiveDate;
use fhir::{AdministrativeGender, ObservationStatus};
use serde::{Serialize, Serializer};

/// Result status of an observation. Shares the bundle's status vocabulary.
pub type ResultStatus = ObservationStatus;

/// Patient identity extracted from the patient-identification segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Patient {
    /// Never empty; falls back to [`DEFAULT_PATIENT_ID`].
    pub id: String,
    pub given_name: String,
    pub family_name: String,
    /// Raw source timestamp, e.g. `19800515`.
    pub birth_date: String,
    /// Raw administrative sex code, e.g. `M`.
    pub sex: String,
}

impl Default for Patient {
    fn default() -> Self {
        Self {
            id: DEFAULT_PATIENT_ID.to_string(),
            given_name: String::new(),
            family_name: String::new(),
            birth_date: String::new(),
            sex: String::new(),
        }
    }
}

impl Patient {
    /// Birth date as `YYYY-MM-DD`, when the source value starts with a full date.
    pub fn birth_date_iso(&self) -> Option<String> {
        normalize::date_only(&self.birth_date)
    }

    /// Birth date as a calendar date, when it is a real one.
    pub fn birth_date_naive(&self) -> Option<NaiveDate> {
        let iso = self.birth_date_iso()?;
        NaiveDate::parse_from_str(&iso, "%Y-%m-%d").ok()
    }

    /// Gender mapped from the administrative sex code.
    pub fn gender(&self) -> Option<AdministrativeGender> {
        normalize::gender_from_sex(&self.sex)
    }
}

/// A result value, numeric when the source text is a plain decimal or integer literal.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObservationValue {
    Numeric(f64),
    Text(String),
}

impl ObservationValue {
    /// `true` for an empty text value.
    pub fn is_empty(&self) -> bool {
        matches!(self, ObservationValue::Text(s) if s.is_empty())
    }
}

impl Default for ObservationValue {
    fn default() -> Self {
        ObservationValue::Text(String::new())
    }
}

impl std::fmt::Display for ObservationValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservationValue::Numeric(n) => write!(f, "{n}"),
            ObservationValue::Text(s) => f.write_str(s),
        }
    }
}

/// Abnormal flag attached to a result value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AbnormalFlag {
    /// No flag sent.
    #[default]
    Unflagged,
    Normal,
    High,
    Low,
    CriticalHigh,
    CriticalLow,
    Abnormal,
    CriticalAbnormal,
    /// Any other code, kept verbatim.
    Other(String),
}

impl AbnormalFlag {
    /// Parse a flag code. Matching ignores case and surrounding whitespace.
    pub fn parse(code: &str) -> Self {
        let code = code.trim();
        match code.to_ascii_uppercase().as_str() {
            "" => AbnormalFlag::Unflagged,
            "N" => AbnormalFlag::Normal,
            "H" => AbnormalFlag::High,
            "L" => AbnormalFlag::Low,
            "HH" => AbnormalFlag::CriticalHigh,
            "LL" => AbnormalFlag::CriticalLow,
            "A" => AbnormalFlag::Abnormal,
            "AA" => AbnormalFlag::CriticalAbnormal,
            _ => AbnormalFlag::Other(code.to_string()),
        }
    }

    /// The flag code, empty for [`AbnormalFlag::Unflagged`].
    pub fn code(&self) -> &str {
        match self {
            AbnormalFlag::Unflagged => "",
            AbnormalFlag::Normal => "N",
            AbnormalFlag::High => "H",
            AbnormalFlag::Low => "L",
            AbnormalFlag::CriticalHigh => "HH",
            AbnormalFlag::CriticalLow => "LL",
            AbnormalFlag::Abnormal => "A",
            AbnormalFlag::CriticalAbnormal => "AA",
            AbnormalFlag::Other(code) => code,
        }
    }

    /// Interpretation code carried into the bundle; only `H`, `L` and `N` qualify.
    pub fn interpretation_code(&self) -> Option<&'static str> {
        match self {
            AbnormalFlag::High => Some("H"),
            AbnormalFlag::Low => Some("L"),
            AbnormalFlag::Normal => Some("N"),
            _ => None,
        }
    }

    /// Human phrase for the flag.
    pub fn phrase(&self) -> Option<&'static str> {
        normalize::flag_phrase(self.code())
    }
}

impl Serialize for AbnormalFlag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

/// Where an observation's value came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Read from a result segment of the source message.
    #[default]
    Source,
    /// Added by a downstream enrichment step.
    Inferred,
}

/// One result extracted from a result segment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Observation {
    pub code: String,
    pub display: String,
    /// Source value type (OBX-2), e.g. `NM` or `TX`.
    pub value_type: String,
    pub value: ObservationValue,
    pub unit: String,
    pub reference_low: Option<String>,
    pub reference_high: Option<String>,
    pub flag: AbnormalFlag,
    /// Raw source timestamp.
    pub observed_at: String,
    pub status: ResultStatus,
    pub notes: Vec<String>,
    pub provenance: Provenance,
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            code: String::new(),
            display: String::new(),
            value_type: String::new(),
            value: ObservationValue::default(),
            unit: String::new(),
            reference_low: None,
            reference_high: None,
            flag: AbnormalFlag::Unflagged,
            observed_at: String::new(),
            status: ResultStatus::Unknown,
            notes: Vec::new(),
            provenance: Provenance::Source,
        }
    }
}

impl Observation {
    /// Fill an empty code from the display and an empty display from the code.
    pub fn backfill_identity(&mut self) {
        if self.display.is_empty() {
            self.display = self.code.clone();
        }
        if self.code.is_empty() {
            self.code = self.display.clone();
        }
    }

    /// Observation timestamp in ISO form (see [`normalize::hl7_timestamp_to_iso`]).
    pub fn observed_at_iso(&self) -> String {
        normalize::hl7_timestamp_to_iso(&self.observed_at)
    }
}
