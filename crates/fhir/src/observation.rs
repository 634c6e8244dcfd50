//! FHIR-aligned Observation resource model.
//!
//! An observation carries at most one value: either `valueQuantity` or `valueString`. The two
//! wire members are private and only reachable through [`ObservationResource::with_value`] and
//! [`ObservationResource::value`], so a resource built in code can never hold both.

use crate::{
    Annotation, CodeableConcept, Coding, FhirError, FhirResult, Quantity, Reference,
    ReferenceRange, INTERPRETATION_SYSTEM,
};
use serde::{Deserialize, Serialize};

/// Observation status vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationStatus {
    Final,
    Preliminary,
    Unknown,
}

impl ObservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationStatus::Final => "final",
            ObservationStatus::Preliminary => "preliminary",
            ObservationStatus::Unknown => "unknown",
        }
    }
}

/// The value of an observation.
#[derive(Clone, Debug, PartialEq)]
pub enum ObservationValue {
    Quantity(Quantity),
    Text(String),
}

/// Observation resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservationResource {
    pub id: String,

    pub status: ObservationStatus,

    pub code: CodeableConcept,

    pub subject: Reference,

    #[serde(rename = "valueQuantity", default, skip_serializing_if = "Option::is_none")]
    value_quantity: Option<Quantity>,

    #[serde(rename = "valueString", default, skip_serializing_if = "Option::is_none")]
    value_string: Option<String>,

    #[serde(
        rename = "effectiveDateTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub effective_date_time: Option<String>,

    #[serde(
        rename = "referenceRange",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub reference_range: Vec<ReferenceRange>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interpretation: Vec<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
}

impl ObservationResource {
    /// Create an observation with its mandatory members.
    ///
    /// # Arguments
    ///
    /// * `id` - Local id, unique within the bundle.
    /// * `status` - Result status.
    /// * `code` - The primary coding; its display also becomes the concept text.
    /// * `subject` - Reference to the patient.
    pub fn new(
        id: impl Into<String>,
        status: ObservationStatus,
        code: Coding,
        subject: Reference,
    ) -> Self {
        let text = code.display.clone().or_else(|| Some(code.code.clone()));
        Self {
            id: id.into(),
            status,
            code: CodeableConcept {
                coding: vec![code],
                text,
            },
            subject,
            value_quantity: None,
            value_string: None,
            effective_date_time: None,
            reference_range: Vec::new(),
            interpretation: Vec::new(),
            note: Vec::new(),
        }
    }

    /// Set the value, replacing any previous one.
    pub fn with_value(mut self, value: Option<ObservationValue>) -> Self {
        self.value_quantity = None;
        self.value_string = None;
        match value {
            Some(ObservationValue::Quantity(q)) => self.value_quantity = Some(q),
            Some(ObservationValue::Text(s)) => self.value_string = Some(s),
            None => {}
        }
        self
    }

    /// Add an interpretation coding for `flag` in the interpretation code system.
    pub fn with_interpretation(mut self, flag: &str) -> Self {
        self.interpretation.push(CodeableConcept {
            coding: vec![Coding {
                system: INTERPRETATION_SYSTEM.to_string(),
                code: flag.to_string(),
                display: None,
            }],
            text: None,
        });
        self
    }

    pub(crate) fn validate(&self) -> FhirResult<()> {
        if self.id.trim().is_empty() {
            return Err(FhirError::InvalidInput(
                "Observation id cannot be empty".into(),
            ));
        }
        if self.value_quantity.is_some() && self.value_string.is_some() {
            return Err(FhirError::InvalidInput(format!(
                "Observation '{}' has both valueQuantity and valueString",
                self.id
            )));
        }
        Ok(())
    }
}
