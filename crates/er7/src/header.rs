//! Message header (MSH) model.

use crate::{Delimiters, Er7Result, Message, Segment};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Header metadata of one message.
///
/// Built once per inbound message and read by the mapper and by acknowledgement
/// construction. Fields are private; a parsed header is never modified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Header {
    field_separator: char,
    encoding_characters: String,
    sending_application: String,
    sending_facility: String,
    receiving_application: String,
    receiving_facility: String,
    message_timestamp: String,
    message_type: String,
    control_id: String,
    processing_id: String,
    version: String,
}

impl Header {
    /// Parse the header of raw message text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Er7Error::MalformedHeader`] when the text does not start with a usable
    /// header segment. Missing trailing fields are not an error; they read as empty strings.
    pub fn parse(text: &str) -> Er7Result<Self> {
        Message::parse(text).map(|message| message.header())
    }

    /// Extract the positional header fields from a tokenised header segment.
    pub fn from_segment(segment: &Segment) -> Self {
        let g = |n: usize| segment.raw_or_empty(n).to_string();

        Self {
            field_separator: segment.delimiters().field,
            encoding_characters: g(2),
            sending_application: g(3),
            sending_facility: g(4),
            receiving_application: g(5),
            receiving_facility: g(6),
            message_timestamp: g(7),
            message_type: g(9),
            control_id: g(10),
            processing_id: g(11),
            version: g(12),
        }
    }

    /// A header with default delimiters and every other field empty.
    ///
    /// Used when an inbound message has no usable header but still needs an acknowledgement.
    pub fn unknown() -> Self {
        Self {
            field_separator: Delimiters::default().field,
            encoding_characters: String::new(),
            sending_application: String::new(),
            sending_facility: String::new(),
            receiving_application: String::new(),
            receiving_facility: String::new(),
            message_timestamp: String::new(),
            message_type: String::new(),
            control_id: String::new(),
            processing_id: String::new(),
            version: String::new(),
        }
    }

    pub fn field_separator(&self) -> char {
        self.field_separator
    }

    /// Raw MSH-2, exactly as sent.
    pub fn encoding_characters(&self) -> &str {
        &self.encoding_characters
    }

    /// Delimiters declared by this header.
    pub fn delimiters(&self) -> Delimiters {
        Delimiters::from_encoding_characters(self.field_separator, &self.encoding_characters)
    }

    pub fn sending_application(&self) -> &str {
        &self.sending_application
    }

    pub fn sending_facility(&self) -> &str {
        &self.sending_facility
    }

    pub fn receiving_application(&self) -> &str {
        &self.receiving_application
    }

    pub fn receiving_facility(&self) -> &str {
        &self.receiving_facility
    }

    /// Raw MSH-7.
    pub fn message_timestamp(&self) -> &str {
        &self.message_timestamp
    }

    /// MSH-7 as a calendar timestamp, when it starts with at least a full date.
    ///
    /// A date-only value resolves to midnight. Precision beyond seconds and any timezone
    /// offset are ignored.
    pub fn message_datetime(&self) -> Option<NaiveDateTime> {
        let ts = self.message_timestamp.trim();
        if let Some(full) = ts.get(..14) {
            if let Ok(dt) = NaiveDateTime::parse_from_str(full, "%Y%m%d%H%M%S") {
                return Some(dt);
            }
        }
        let date = ts.get(..8)?;
        NaiveDate::parse_from_str(date, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// Raw MSH-9, e.g. `ORU^R01`.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// MSH-10, the opaque correlation token echoed in acknowledgements.
    pub fn control_id(&self) -> &str {
        &self.control_id
    }

    pub fn processing_id(&self) -> &str {
        &self.processing_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}
