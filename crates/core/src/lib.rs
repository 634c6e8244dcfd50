//! # Labflow Core
//!
//! Core mapping logic for lab result ingestion.
//!
//! This crate turns ER7 result messages into typed entities and a resource bundle:
//! - segment mapping into [`Patient`] and [`Observation`] entities ([`mapper`])
//! - value normalisation: timestamps, flags, statuses, genders, ranges ([`normalize`])
//! - code normalisation against an ordered table ([`CodeTable`])
//! - bundle construction ([`bundle::build_bundle`]) and a deterministic summary
//! - one entry point tying it together ([`ResultPipeline::run`])
//!
//! **No transport concerns**: framing, sockets and acknowledgements belong in `mllp`.

pub mod bundle;
pub mod code_table;
pub mod config;
pub mod constants;
pub mod extract;
pub mod mapper;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod summary;

mod error;

pub use code_table::{CodeRule, CodeTable};
pub use config::CoreConfig;
pub use error::{PipelineError, PipelineResult};
pub use model::{AbnormalFlag, Observation, ObservationValue, Patient, Provenance, ResultStatus};
pub use pipeline::{PipelineOptions, PipelineOutput, ResultPipeline};
