//! Value normalisation.
//!
//! Deterministic, side-effect-free conversions applied to mapped entities: timestamps, flag
//! phrases, status and gender vocabularies, reference ranges and value typing. Code
//! normalisation lives in [`crate::code_table`] because it depends on a table.

use crate::model::ObservationValue;
use fhir::{AdministrativeGender, ObservationStatus};

/// Convert a source timestamp to ISO 8601.
///
/// - 14 leading digits become `YYYY-MM-DDTHH:MM:SS`; a tail starting with `.` (fractional
///   seconds, optionally a zone offset) is kept verbatim.
/// - otherwise 8 leading digits become `YYYY-MM-DD`.
/// - anything else is returned unchanged (after trimming).
pub fn hl7_timestamp_to_iso(raw: &str) -> String {
    let ts = raw.trim();

    if let Some(digits) = leading_digits(ts, 14) {
        let rest = &ts[14..];
        let base = format!(
            "{}-{}-{}T{}:{}:{}",
            &digits[0..4],
            &digits[4..6],
            &digits[6..8],
            &digits[8..10],
            &digits[10..12],
            &digits[12..14]
        );
        if rest.starts_with('.') {
            return format!("{base}{rest}");
        }
        return base;
    }

    date_only(ts).unwrap_or_else(|| ts.to_string())
}

/// `YYYY-MM-DD` from the first 8 digits of `raw`, when present.
pub fn date_only(raw: &str) -> Option<String> {
    let digits = leading_digits(raw.trim(), 8)?;
    Some(format!(
        "{}-{}-{}",
        &digits[0..4],
        &digits[4..6],
        &digits[6..8]
    ))
}

fn leading_digits(ts: &str, count: usize) -> Option<&str> {
    let prefix = ts.get(..count)?;
    prefix.bytes().all(|b| b.is_ascii_digit()).then_some(prefix)
}

/// Human phrase for an abnormal flag code.
pub fn flag_phrase(flag: &str) -> Option<&'static str> {
    match flag.trim().to_ascii_uppercase().as_str() {
        "H" => Some("high"),
        "L" => Some("low"),
        "N" => Some("within normal range"),
        _ => None,
    }
}

/// Result status from a status code: `F` final, `P` preliminary, anything else unknown.
pub fn status_from_code(code: &str) -> ObservationStatus {
    match code.trim().to_ascii_uppercase().as_str() {
        "F" => ObservationStatus::Final,
        "P" => ObservationStatus::Preliminary,
        _ => ObservationStatus::Unknown,
    }
}

/// Gender from an administrative sex code. Unrecognised codes yield `None`.
pub fn gender_from_sex(sex: &str) -> Option<AdministrativeGender> {
    match sex.trim().to_ascii_uppercase().as_str() {
        "M" => Some(AdministrativeGender::Male),
        "F" => Some(AdministrativeGender::Female),
        "O" | "OTHER" => Some(AdministrativeGender::Other),
        "U" | "UNKNOWN" => Some(AdministrativeGender::Unknown),
        _ => None,
    }
}

/// Split a reference range into `(low, high)`.
///
/// The text is split once on the first hyphen and each side trimmed; an empty side is `None`.
/// Without a hyphen the whole text is a high-only bound, so `<150` means "below 150".
pub fn parse_reference_range(raw: &str) -> (Option<String>, Option<String>) {
    let range = raw.trim();
    if range.is_empty() {
        return (None, None);
    }

    fn side(s: &str) -> Option<String> {
        Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
    }

    match range.split_once('-') {
        Some((low, high)) => (side(low), side(high)),
        None => (None, Some(range.to_string())),
    }
}

/// Type a raw result value.
///
/// A plain integer or decimal literal (optional sign, digits, at most one decimal point)
/// that fits a finite `f64` becomes [`ObservationValue::Numeric`]; everything else, empty
/// text and overflowing literals included, stays text.
pub fn parse_value(raw: &str) -> ObservationValue {
    let value = raw.trim();
    if is_decimal_literal(value) {
        match value.parse::<f64>() {
            Ok(number) if number.is_finite() => return ObservationValue::Numeric(number),
            _ => {}
        }
    }
    ObservationValue::Text(value.to_string())
}

fn is_decimal_literal(s: &str) -> bool {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let mut digits = 0;
    let mut points = 0;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            _ => return false,
        }
    }
    digits > 0 && points <= 1
}
