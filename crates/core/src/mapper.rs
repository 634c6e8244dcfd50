//! Segment mapper: tokenised message to Patient and Observation entities.

use crate::constants::{NOTE_SEGMENT, PATIENT_SEGMENT, RESULT_SEGMENT};
use crate::extract::{self, best_effort};
use crate::model::{AbnormalFlag, Observation, Patient, Provenance};
use crate::normalize;
use er7::{Message, Segment};

/// Patient from the first patient-identification segment. Later duplicates are ignored.
///
/// A message without one yields [`Patient::default`].
pub fn map_patient(message: &Message) -> Patient {
    let Some(pid) = message.first(PATIENT_SEGMENT) else {
        tracing::debug!("message has no {PATIENT_SEGMENT} segment");
        return Patient::default();
    };

    let mut patient = Patient::default();
    if let Some(id) = extract::pid_identifier(pid) {
        patient.id = id;
    }
    patient.family_name = best_effort(pid, "family_name", extract::pid_family_name);
    patient.given_name = best_effort(pid, "given_name", extract::pid_given_name);
    patient.birth_date = best_effort(pid, "birth_date", extract::pid_birth_date);
    patient.sex = best_effort(pid, "sex", extract::pid_sex);
    patient
}

/// Observations from result segments, in document order.
///
/// Note segments that directly follow a result segment (or another note attached to it) are
/// appended to that observation's notes. Any other segment ends the attachment.
pub fn map_observations(message: &Message) -> Vec<Observation> {
    let mut observations: Vec<Observation> = Vec::new();
    let mut attached = false;

    for segment in message.segments() {
        match segment.name() {
            RESULT_SEGMENT => {
                observations.push(map_result(segment));
                attached = true;
            }
            NOTE_SEGMENT if attached => {
                if let (Some(comment), Some(current)) =
                    (extract::nte_comment(segment), observations.last_mut())
                {
                    current.notes.push(comment);
                }
            }
            _ => attached = false,
        }
    }

    observations
}

fn map_result(obx: &Segment) -> Observation {
    let raw_value = best_effort(obx, "value", extract::obx_value);
    let raw_range = best_effort(obx, "reference_range", extract::obx_reference_range);
    let (reference_low, reference_high) = normalize::parse_reference_range(&raw_range);
    let flag: String = best_effort(obx, "flag", extract::obx_flag);
    let status: String = best_effort(obx, "status", extract::obx_status);

    let mut observation = Observation {
        code: best_effort(obx, "code", extract::obx_code),
        display: best_effort(obx, "display", extract::obx_display),
        value_type: best_effort(obx, "value_type", extract::obx_value_type),
        value: normalize::parse_value(&raw_value),
        unit: best_effort(obx, "unit", extract::obx_unit),
        reference_low,
        reference_high,
        flag: AbnormalFlag::parse(&flag),
        observed_at: best_effort(obx, "observed_at", extract::obx_observed_at),
        status: normalize::status_from_code(&status),
        notes: Vec::new(),
        provenance: Provenance::Source,
    };
    observation.backfill_identity();
    observation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObservationValue;
    use fhir::ObservationStatus;

    const HEADER: &str = "MSH|^~\\&|HIS|MC|LIS|LAB|20250122090000||ORU^R01|MSG001|P|2.5\r";

    fn message(body: &str) -> Message {
        Message::parse(&format!("{HEADER}{body}")).expect("parse")
    }

    #[test]
    fn first_patient_segment_wins() {
        let msg = message(
            "PID|1||12345^^^MRN||SMITH^JOHN||19800515|M\rPID|2||99999||DOE^JANE||19900101|F\r",
        );
        let patient = map_patient(&msg);
        assert_eq!(patient.id, "12345");
        assert_eq!(patient.family_name, "SMITH");
        assert_eq!(patient.given_name, "JOHN");
        assert_eq!(patient.birth_date, "19800515");
        assert_eq!(patient.sex, "M");
    }

    #[test]
    fn missing_patient_uses_placeholder() {
        let patient = map_patient(&message("OBX|1|NM|GLU^GLUCOSE||105\r"));
        assert_eq!(patient, Patient::default());

        let partial = map_patient(&message("PID|1\r"));
        assert_eq!(partial.id, "patient-1");
        assert_eq!(partial.family_name, "");
    }

    #[test]
    fn maps_result_segment() {
        let msg = message(
            "OBX|1|NM|GLU^GLUCOSE||105|mg/dL|70-100|N|||F|||20250122083000\r",
        );
        let observations = map_observations(&msg);
        assert_eq!(observations.len(), 1);

        let obs = &observations[0];
        assert_eq!(obs.code, "GLU");
        assert_eq!(obs.display, "GLUCOSE");
        assert_eq!(obs.value_type, "NM");
        assert_eq!(obs.value, ObservationValue::Numeric(105.0));
        assert_eq!(obs.unit, "mg/dL");
        assert_eq!(obs.reference_low.as_deref(), Some("70"));
        assert_eq!(obs.reference_high.as_deref(), Some("100"));
        assert_eq!(obs.flag, AbnormalFlag::Normal);
        assert_eq!(obs.status, ObservationStatus::Final);
        assert_eq!(obs.observed_at, "20250122083000");
        assert_eq!(obs.provenance, Provenance::Source);
    }

    #[test]
    fn sparse_result_keeps_observation_with_zero_values() {
        let observations = map_observations(&message("OBX|1||^Comment\r"));
        assert_eq!(observations.len(), 1);

        let obs = &observations[0];
        assert_eq!(obs.code, "Comment");
        assert_eq!(obs.display, "Comment");
        assert_eq!(obs.value, ObservationValue::Text(String::new()));
        assert_eq!(obs.unit, "");
        assert_eq!(obs.reference_low, None);
        assert_eq!(obs.reference_high, None);
        assert_eq!(obs.flag, AbnormalFlag::Unflagged);
        assert_eq!(obs.status, ObservationStatus::Unknown);
    }

    #[test]
    fn code_or_display_backfills_the_other() {
        let observations = map_observations(&message(
            "OBX|1|NM|GLU||105\rOBX|2|NM|^Hemoglobin||13.5\rOBX|3|ST|||x\r",
        ));
        assert_eq!(observations[0].display, "GLU");
        assert_eq!(observations[1].code, "Hemoglobin");
        assert_eq!(observations[2].code, "");
        assert_eq!(observations[2].display, "");
    }

    #[test]
    fn notes_attach_to_preceding_result_only() {
        let msg = message(
            "NTE|1||orphan before results\r\
OBX|1|NM|GLU^GLUCOSE||105\r\
NTE|1||Fasting sample\r\
NTE|2||Repeat requested\r\
OBX|2|NM|HGB^Hemoglobin||13.5\r\
OBR|2\r\
NTE|1||belongs to the order\r",
        );
        let observations = map_observations(&msg);
        assert_eq!(observations.len(), 2);
        assert_eq!(
            observations[0].notes,
            vec!["Fasting sample".to_string(), "Repeat requested".to_string()]
        );
        assert!(observations[1].notes.is_empty());
    }

    #[test]
    fn result_order_is_preserved() {
        let msg = message("OBX|1|NM|A^Alpha||1\rOBX|2|NM|B^Beta||2\rOBX|3|NM|C^Gamma||3\r");
        let codes: Vec<String> = map_observations(&msg).into_iter().map(|o| o.code).collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
    }
}
