//! FHIR wire support for lab result bundles.
//!
//! This crate provides **wire models** and **format helpers** for the resource graph emitted by
//! the ingestion pipeline:
//! - a collection [`Bundle`] holding one Patient and N Observations
//! - the [`PatientResource`] and [`ObservationResource`] shapes and the small datatypes they use
//!
//! This crate focuses on:
//! - FHIR JSON shape (field names, optional blocks omitted when empty)
//! - strict parsing with path-annotated errors
//! - bundle-level invariants (one Patient, every subject resolves to it)
//!
//! It does not know how ER7 fields map onto resources; that translation lives in
//! `labflow-core`.

pub mod bundle;
pub mod datatypes;
pub mod observation;
pub mod patient;

// Re-export facades
pub use bundle::{Bundle, BundleEntry, BundleType, Resource};
pub use observation::{ObservationResource, ObservationStatus, ObservationValue};
pub use patient::{AdministrativeGender, PatientResource};

// Re-export datatypes
pub use datatypes::{
    Annotation, CodeableConcept, Coding, HumanName, Quantity, RangeBound, RangeValue,
    Reference, ReferenceRange,
};

/// Coding system for observation codes.
pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// Coding system for observation interpretation flags.
pub const INTERPRETATION_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation";

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
