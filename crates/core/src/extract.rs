//! Per-field accessors for the segments the mapper reads.
//!
//! Each accessor reads exactly one attribute and returns `None` on structural absence. The
//! mapper composes them through [`best_effort`], which substitutes the attribute's zero value
//! and records the fallback, so one unreadable field never discards the rest of its segment.

use er7::Segment;

/// Run `read` against `segment`, falling back to `T::default()` when it yields nothing.
pub fn best_effort<T, F>(segment: &Segment, attribute: &str, read: F) -> T
where
    T: Default,
    F: FnOnce(&Segment) -> Option<T>,
{
    match read(segment) {
        Some(value) => value,
        None => {
            tracing::trace!(
                segment = segment.name(),
                attribute,
                "field absent, using zero value"
            );
            T::default()
        }
    }
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

// ============================================================================
// PID
// ============================================================================

/// PID-3, first repetition, first component.
pub fn pid_identifier(pid: &Segment) -> Option<String> {
    pid.field(3)?
        .component_value(1)
        .map(trimmed)
        .filter(|id| !id.is_empty())
}

/// PID-5 component 1.
pub fn pid_family_name(pid: &Segment) -> Option<String> {
    pid.field(5)?.component_value(1).map(trimmed)
}

/// PID-5 component 2.
pub fn pid_given_name(pid: &Segment) -> Option<String> {
    pid.field(5)?.component_value(2).map(trimmed)
}

/// PID-7 component 1 (the timestamp itself, without precision suffixes).
pub fn pid_birth_date(pid: &Segment) -> Option<String> {
    pid.field(7)?.component_value(1).map(trimmed)
}

/// PID-8.
pub fn pid_sex(pid: &Segment) -> Option<String> {
    pid.field(8).map(|f| trimmed(f.value()))
}

// ============================================================================
// OBX
// ============================================================================

/// OBX-2.
pub fn obx_value_type(obx: &Segment) -> Option<String> {
    obx.field(2).map(|f| trimmed(f.value()))
}

/// OBX-3 component 1.
pub fn obx_code(obx: &Segment) -> Option<String> {
    obx.field(3)?.component_value(1).map(trimmed)
}

/// OBX-3 component 2.
pub fn obx_display(obx: &Segment) -> Option<String> {
    obx.field(3)?.component_value(2).map(trimmed)
}

/// OBX-5, first repetition, decoded.
pub fn obx_value(obx: &Segment) -> Option<String> {
    obx.field(5).map(|f| trimmed(f.value()))
}

/// OBX-6 as the full encoded string, component separators kept.
///
/// Units such as `10^3/uL` are encoded with a component separator; reading only the first
/// component would truncate them to `10`. Trailing empty components are dropped.
pub fn obx_unit(obx: &Segment) -> Option<String> {
    let field = obx.field(6)?;
    let component = obx.delimiters().component;
    Some(
        field
            .value()
            .trim()
            .trim_end_matches(component)
            .trim()
            .to_string(),
    )
}

/// OBX-7.
pub fn obx_reference_range(obx: &Segment) -> Option<String> {
    obx.field(7).map(|f| trimmed(f.value()))
}

/// OBX-8.
pub fn obx_flag(obx: &Segment) -> Option<String> {
    obx.field(8).map(|f| trimmed(f.value()))
}

/// OBX-11.
pub fn obx_status(obx: &Segment) -> Option<String> {
    obx.field(11).map(|f| trimmed(f.value()))
}

/// OBX-14 component 1.
pub fn obx_observed_at(obx: &Segment) -> Option<String> {
    obx.field(14)?.component_value(1).map(trimmed)
}

// ============================================================================
// NTE
// ============================================================================

/// NTE-3, decoded. Blank comments yield `None`.
pub fn nte_comment(nte: &Segment) -> Option<String> {
    nte.field(3)
        .map(|f| trimmed(f.value()))
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use er7::Message;

    fn segment(text: &str, name: &str) -> Segment {
        let message = Message::parse(text).expect("parse");
        message.first(name).cloned().expect("segment present")
    }

    const HEADER: &str = "MSH|^~\\&|HIS|MC|LIS|LAB|20250122090000||ORU^R01|MSG001|P|2.5\r";

    #[test]
    fn reads_patient_fields() {
        let pid = segment(
            &format!("{HEADER}PID|1||12345^^^MRN~999^^^ALT||SMITH^JOHN^Q||19800515|M\r"),
            "PID",
        );
        assert_eq!(pid_identifier(&pid).as_deref(), Some("12345"));
        assert_eq!(pid_family_name(&pid).as_deref(), Some("SMITH"));
        assert_eq!(pid_given_name(&pid).as_deref(), Some("JOHN"));
        assert_eq!(pid_birth_date(&pid).as_deref(), Some("19800515"));
        assert_eq!(pid_sex(&pid).as_deref(), Some("M"));
    }

    #[test]
    fn short_segments_fall_back_to_zero_values() {
        let pid = segment(&format!("{HEADER}PID|1\r"), "PID");
        assert_eq!(pid_identifier(&pid), None);
        assert_eq!(best_effort(&pid, "sex", pid_sex), String::new());
        assert_eq!(best_effort(&pid, "family_name", pid_family_name), "");
    }

    #[test]
    fn empty_identifier_is_absent() {
        let pid = segment(&format!("{HEADER}PID|1||^^^MRN\r"), "PID");
        assert_eq!(pid_identifier(&pid), None);
    }

    #[test]
    fn reads_result_fields() {
        let obx = segment(
            &format!(
                "{HEADER}OBX|1|NM|2345-7^GLUCOSE^LN||105|mg/dL|70-100|H|||F|||20250122083000\r"
            ),
            "OBX",
        );
        assert_eq!(obx_value_type(&obx).as_deref(), Some("NM"));
        assert_eq!(obx_code(&obx).as_deref(), Some("2345-7"));
        assert_eq!(obx_display(&obx).as_deref(), Some("GLUCOSE"));
        assert_eq!(obx_value(&obx).as_deref(), Some("105"));
        assert_eq!(obx_unit(&obx).as_deref(), Some("mg/dL"));
        assert_eq!(obx_reference_range(&obx).as_deref(), Some("70-100"));
        assert_eq!(obx_flag(&obx).as_deref(), Some("H"));
        assert_eq!(obx_status(&obx).as_deref(), Some("F"));
        assert_eq!(obx_observed_at(&obx).as_deref(), Some("20250122083000"));
    }

    #[test]
    fn unit_keeps_embedded_component_separator() {
        let obx = segment(
            &format!("{HEADER}OBX|1|NM|6690-2^WBC||7.2|10^3/uL|4.0-11.0|N|||F\r"),
            "OBX",
        );
        assert_eq!(obx_unit(&obx).as_deref(), Some("10^3/uL"));

        let trailing = segment(&format!("{HEADER}OBX|1|NM|X||1|mg/dL^^\r"), "OBX");
        assert_eq!(obx_unit(&trailing).as_deref(), Some("mg/dL"));
    }

    #[test]
    fn value_uses_first_repetition_and_decodes_escapes() {
        let obx = segment(
            &format!("{HEADER}OBX|1|TX|NOTE^Comment||a \\T\\ b~second\r"),
            "OBX",
        );
        assert_eq!(obx_value(&obx).as_deref(), Some("a & b"));
    }

    #[test]
    fn blank_note_is_absent() {
        let nte = segment(&format!("{HEADER}NTE|1|L|   \r"), "NTE");
        assert_eq!(nte_comment(&nte), None);
        let nte = segment(&format!("{HEADER}NTE|1|L|Fasting sample\r"), "NTE");
        assert_eq!(nte_comment(&nte).as_deref(), Some("Fasting sample"));
    }
}
