//! Acknowledgement construction.
//!
//! An acknowledgement is a two-segment message: a header segment with sender and receiver
//! swapped, and an `MSA` segment carrying the acknowledgement code, the original control id and
//! optional free text. Both segments end with [`SEGMENT_TERMINATOR`].

use crate::escape::escape;
use crate::{Delimiters, Header, HEADER_SEGMENT, SEGMENT_TERMINATOR};
use serde::Serialize;

/// Message type stamped on every acknowledgement (MSH-9).
pub const ACK_MESSAGE_TYPE: &str = "ACK";

/// Name of the acknowledgement segment.
pub const ACK_SEGMENT: &str = "MSA";

/// Processing id used when the original header has none.
pub const DEFAULT_PROCESSING_ID: &str = "P";

/// Version used when the original header has none.
pub const DEFAULT_VERSION: &str = "2.5.1";

/// Acknowledgement code (MSA-1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AckCode {
    /// `AA`: message accepted.
    Accept,
    /// `AE`: message could not be processed.
    Error,
    /// `AR`: message rejected outright.
    Reject,
}

impl AckCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AckCode::Accept => "AA",
            AckCode::Error => "AE",
            AckCode::Reject => "AR",
        }
    }
}

impl std::fmt::Display for AckCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build an acknowledgement for `original`.
///
/// Sending and receiving application/facility are swapped, MSH-9 becomes `ACK` and the
/// original control id is echoed in both MSH-10 and MSA-2. `text`, when present and non-empty,
/// becomes MSA-3 with delimiter characters escaped.
///
/// # Arguments
///
/// * `original` - Header of the message being acknowledged.
/// * `code` - Acknowledgement code.
/// * `text` - Optional free text, typically an error description.
///
/// # Returns
///
/// The acknowledgement as ER7 text, one terminator after each segment.
pub fn build(original: &Header, code: AckCode, text: Option<&str>) -> String {
    let fs = original.field_separator().to_string();
    let delimiters = original.delimiters();

    let encoding = non_empty_or(
        original.encoding_characters(),
        &Delimiters::default().encoding_characters(),
    );

    let msh = [
        HEADER_SEGMENT,
        encoding.as_str(),
        original.receiving_application(),
        original.receiving_facility(),
        original.sending_application(),
        original.sending_facility(),
        "",
        "",
        ACK_MESSAGE_TYPE,
        original.control_id(),
        non_empty_or(original.processing_id(), DEFAULT_PROCESSING_ID).as_str(),
        non_empty_or(original.version(), DEFAULT_VERSION).as_str(),
    ]
    .join(fs.as_str());

    let mut msa = vec![
        ACK_SEGMENT.to_string(),
        code.as_str().to_string(),
        original.control_id().to_string(),
    ];
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        msa.push(escape(text, &delimiters));
    }
    let msa = msa.join(fs.as_str());

    let mut out = String::with_capacity(msh.len() + msa.len() + 2);
    out.push_str(&msh);
    out.push(SEGMENT_TERMINATOR);
    out.push_str(&msa);
    out.push(SEGMENT_TERMINATOR);
    out
}

/// The acknowledgement sent when an inbound message has no usable header or control id.
///
/// Renders as `MSH|^~\&|||||||ACK||P|2.5.1<CR>MSA|AE|<CR>`.
pub fn generic_reject() -> String {
    build(&Header::unknown(), AckCode::Error, None)
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
