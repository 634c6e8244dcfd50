//! Tokenisation of ER7 text into segments, fields and components.
//!
//! Field numbering follows the legacy format's 1-indexed convention for every segment. For
//! ordinary segments field `N` is the `N`th value after the segment name. The header segment is
//! special: its first field *is* the field separator, so `MSH-2` (encoding characters) is the
//! first value after the name and `MSH-10` (control id) is the ninth.

use crate::escape::unescape;
use crate::{Delimiters, Er7Error, Er7Result, Header, HEADER_SEGMENT, SEGMENT_TERMINATOR};

/// Normalise line endings and drop blank lines.
///
/// `\r\n`, `\n` and `\r` are all treated as segment terminators. Lines containing only
/// whitespace are discarded. The returned slices borrow from `text`.
pub fn split_segments(text: &str) -> Vec<&str> {
    text.split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Re-join the segments of `text` with the canonical terminator, one trailing terminator
/// included. Returns an empty string when `text` has no segments.
pub fn normalize(text: &str) -> String {
    let segments = split_segments(text);
    if segments.is_empty() {
        return String::new();
    }

    let terminator = SEGMENT_TERMINATOR.to_string();
    let mut out = segments.join(terminator.as_str());
    out.push(SEGMENT_TERMINATOR);
    out
}

/// A tokenised ER7 message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    delimiters: Delimiters,
    segments: Vec<Segment>,
}

impl Message {
    /// Tokenise raw message text.
    ///
    /// # Errors
    ///
    /// Returns [`Er7Error::MalformedHeader`] if:
    /// - the text contains no segments,
    /// - the first segment is not a header segment,
    /// - the header segment is too short to declare a field separator.
    pub fn parse(text: &str) -> Er7Result<Self> {
        let lines = split_segments(text);

        let first = lines
            .first()
            .ok_or_else(|| Er7Error::MalformedHeader("message contains no segments".into()))?;

        if !first.starts_with(HEADER_SEGMENT) {
            let name: String = first.chars().take(HEADER_SEGMENT.len()).collect();
            return Err(Er7Error::MalformedHeader(format!(
                "first segment must be {HEADER_SEGMENT}, got '{name}'"
            )));
        }

        let field_separator = first.chars().nth(HEADER_SEGMENT.len()).ok_or_else(|| {
            Er7Error::MalformedHeader(
                "header segment is too short to declare a field separator".into(),
            )
        })?;

        let encoding = first.split(field_separator).nth(1).unwrap_or_default();
        let delimiters = Delimiters::from_encoding_characters(field_separator, encoding);

        let segments = lines
            .into_iter()
            .map(|line| Segment::parse(line, delimiters))
            .collect();

        Ok(Self {
            delimiters,
            segments,
        })
    }

    /// Delimiters declared by the header segment.
    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// All segments in document order. The first is always the header segment.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The header segment.
    pub fn header_segment(&self) -> &Segment {
        // `parse` guarantees at least one segment and that it is the header.
        &self.segments[0]
    }

    /// Parsed header metadata.
    pub fn header(&self) -> Header {
        Header::from_segment(self.header_segment())
    }

    /// First segment named `name`, if any.
    pub fn first(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name() == name)
    }

    /// All segments named `name`, in document order.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Segment> + 'a {
        self.segments.iter().filter(move |s| s.name() == name)
    }
}

/// One segment of a message.
///
/// `fields[0]` is the segment name and `fields[N]` is field `N`, for header segments too
/// (the separator itself is stored as `MSH-1`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    fields: Vec<String>,
    delimiters: Delimiters,
}

impl Segment {
    fn parse(line: &str, delimiters: Delimiters) -> Self {
        let mut parts = line.split(delimiters.field).map(str::to_string);
        let name = parts.next().unwrap_or_default();

        let mut fields = vec![name];
        if fields[0] == HEADER_SEGMENT {
            fields.push(delimiters.field.to_string());
        }
        fields.extend(parts);

        Self { fields, delimiters }
    }

    /// Three-letter segment name, e.g. `OBX`.
    pub fn name(&self) -> &str {
        &self.fields[0]
    }

    /// Raw text of field `number`, or `None` when the segment is shorter.
    pub fn raw(&self, number: usize) -> Option<&str> {
        if number == 0 {
            return None;
        }
        self.fields.get(number).map(String::as_str)
    }

    /// Raw text of field `number`; structural absence resolves to an empty string.
    pub fn raw_or_empty(&self, number: usize) -> &str {
        self.raw(number).unwrap_or_default()
    }

    /// Field `number` as a [`Field`] view for component access.
    pub fn field(&self, number: usize) -> Option<Field<'_>> {
        self.raw(number).map(|raw| Field {
            raw,
            delimiters: &self.delimiters,
        })
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }
}

/// Borrowed view over one field (or one repetition of a field).
#[derive(Clone, Copy, Debug)]
pub struct Field<'a> {
    raw: &'a str,
    delimiters: &'a Delimiters,
}

impl<'a> Field<'a> {
    /// Raw encoded text, escape sequences and separators intact.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Repetition `index` (0-based).
    pub fn repetition(&self, index: usize) -> Option<Field<'a>> {
        self.raw
            .split(self.delimiters.repetition)
            .nth(index)
            .map(|raw| Field {
                raw,
                delimiters: self.delimiters,
            })
    }

    /// The first repetition; a field without repetitions is its own first repetition.
    pub fn first_repetition(&self) -> Field<'a> {
        self.repetition(0).unwrap_or(*self)
    }

    /// Raw text of component `number` (1-indexed) of the first repetition.
    pub fn component(&self, number: usize) -> Option<&'a str> {
        if number == 0 {
            return None;
        }
        self.first_repetition()
            .raw
            .split(self.delimiters.component)
            .nth(number - 1)
    }

    /// Raw text of subcomponent `sub` of component `number` (both 1-indexed).
    pub fn subcomponent(&self, number: usize, sub: usize) -> Option<&'a str> {
        if sub == 0 {
            return None;
        }
        self.component(number)?
            .split(self.delimiters.subcomponent)
            .nth(sub - 1)
    }

    /// Decoded text of the whole first repetition.
    pub fn value(&self) -> String {
        unescape(self.first_repetition().raw, self.delimiters)
    }

    /// Decoded text of component `number`, or `None` when absent.
    pub fn component_value(&self, number: usize) -> Option<String> {
        self.component(number)
            .map(|raw| unescape(raw, self.delimiters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "MSH|^~\\&|HIS|MC|LIS|LAB|20250122090000||ORU^R01|MSG001|P|2.5\r\n\
PID|1||12345^^^MRN~999^^^ALT||SMITH^JOHN||19800515|M\n\
\n\
OBX|1|NM|GLU^GLUCOSE||105|mg/dL|70-100|N|||F|||20250122083000\r";

    #[test]
    fn normalises_mixed_line_endings_and_blank_lines() {
        let lines = split_segments(SAMPLE);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("PID"));
        assert!(lines[2].starts_with("OBX"));

        let normalized = normalize("MSH|^~\\&\n\n  \r\nPID|1\r");
        assert_eq!(normalized, "MSH|^~\\&\rPID|1\r");
        assert_eq!(normalize("\n \r\n"), "");
    }

    #[test]
    fn header_fields_use_header_numbering() {
        let msg = Message::parse(SAMPLE).expect("parse");
        let msh = msg.header_segment();
        assert_eq!(msh.raw(1), Some("|"));
        assert_eq!(msh.raw(2), Some("^~\\&"));
        assert_eq!(msh.raw(3), Some("HIS"));
        assert_eq!(msh.raw(9), Some("ORU^R01"));
        assert_eq!(msh.raw(10), Some("MSG001"));
        assert_eq!(msh.raw(12), Some("2.5"));
        assert_eq!(msh.raw(13), None);
        assert_eq!(msh.raw_or_empty(20), "");
    }

    #[test]
    fn ordinary_segments_number_after_the_name() {
        let msg = Message::parse(SAMPLE).expect("parse");
        let pid = msg.first("PID").expect("pid");
        assert_eq!(pid.raw(1), Some("1"));

        let ids = pid.field(3).expect("PID-3");
        assert_eq!(ids.first_repetition().raw(), "12345^^^MRN");
        assert_eq!(ids.repetition(1).map(|r| r.raw()), Some("999^^^ALT"));
        assert_eq!(ids.component(1), Some("12345"));

        let name = pid.field(5).expect("PID-5");
        assert_eq!(name.component(1), Some("SMITH"));
        assert_eq!(name.component(2), Some("JOHN"));
        assert_eq!(name.component(3), None);
    }

    #[test]
    fn respects_declared_delimiters() {
        let msg = Message::parse("MSH#$~\\&#APP\rOBX#1#NM#A$B").expect("parse");
        assert_eq!(msg.delimiters().field, '#');
        assert_eq!(msg.delimiters().component, '$');

        let obx = msg.first("OBX").expect("obx");
        let code = obx.field(3).expect("OBX-3");
        assert_eq!(code.component(1), Some("A"));
        assert_eq!(code.component(2), Some("B"));
    }

    #[test]
    fn subcomponents_and_escapes() {
        let msg = Message::parse("MSH|^~\\&\rNTE|1||a\\F\\b^x&y").expect("parse");
        let field = msg.first("NTE").and_then(|s| s.field(3)).expect("NTE-3");
        assert_eq!(field.component_value(1).as_deref(), Some("a|b"));
        assert_eq!(field.subcomponent(2, 2), Some("y"));
        assert_eq!(field.subcomponent(2, 3), None);
    }

    #[test]
    fn rejects_missing_or_foreign_first_segment() {
        let err = Message::parse("").expect_err("empty");
        assert!(matches!(err, Er7Error::MalformedHeader(_)));

        let err = Message::parse("PID|1||123\rMSH|^~\\&").expect_err("no header first");
        match err {
            Er7Error::MalformedHeader(msg) => assert!(msg.contains("PID")),
        }
    }

    #[test]
    fn rejects_header_without_separator() {
        let err = Message::parse("MSH\rPID|1").expect_err("too short");
        match err {
            Er7Error::MalformedHeader(msg) => assert!(msg.contains("too short")),
        }
    }

    #[test]
    fn filters_segments_by_name_in_order() {
        let msg = Message::parse("MSH|^~\\&\rOBX|1\rNTE|1\rOBX|2").expect("parse");
        let set_ids: Vec<&str> = msg.all("OBX").map(|s| s.raw_or_empty(1)).collect();
        assert_eq!(set_ids, vec!["1", "2"]);
        assert!(msg.first("ZZZ").is_none());
    }
}
