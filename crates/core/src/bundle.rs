//! Bundle builder: normalised entities to a collection bundle.
//!
//! The builder is pure. The same patient and observations always produce an equal bundle, and
//! a change to any observation means building a new bundle rather than editing the old one.

use crate::constants::{OBSERVATION_ID_PREFIX, UNKNOWN_CODE};
use crate::model::{Observation, ObservationValue, Patient};
use crate::PipelineResult;
use fhir::{
    Annotation, Bundle, Coding, ObservationResource, PatientResource, Quantity, RangeBound,
    RangeValue, Reference, ReferenceRange, LOINC_SYSTEM,
};

/// Build the collection bundle: the patient first, then one observation per entity in order.
///
/// # Errors
///
/// Returns [`crate::PipelineError::Fhir`] if the assembled bundle breaks the bundle rules
/// (for example an empty patient id).
pub fn build_bundle(patient: &Patient, observations: &[Observation]) -> PipelineResult<Bundle> {
    let patient_resource = patient_resource(patient)?;
    let subject = Reference::to("Patient", &patient_resource.id);

    let resources = observations
        .iter()
        .enumerate()
        .map(|(index, obs)| {
            observation_resource(
                format!("{OBSERVATION_ID_PREFIX}{}", index + 1),
                obs,
                subject.clone(),
            )
        })
        .collect();

    Ok(Bundle::collection(patient_resource, resources)?)
}

fn patient_resource(patient: &Patient) -> PipelineResult<PatientResource> {
    Ok(PatientResource::new(patient.id.clone())?
        .with_name(&patient.family_name, &patient.given_name)
        .with_birth_date(patient.birth_date_iso())
        .with_gender(patient.gender()))
}

fn observation_resource(id: String, obs: &Observation, subject: Reference) -> ObservationResource {
    let code = if obs.code.is_empty() {
        UNKNOWN_CODE.to_string()
    } else {
        obs.code.clone()
    };
    let display = if obs.display.is_empty() {
        code.clone()
    } else {
        obs.display.clone()
    };

    let value = match &obs.value {
        ObservationValue::Numeric(number) => Some(fhir::ObservationValue::Quantity(Quantity {
            value: *number,
            unit: Some(obs.unit.clone()).filter(|u| !u.is_empty()),
        })),
        ObservationValue::Text(text) if !text.is_empty() => {
            Some(fhir::ObservationValue::Text(text.clone()))
        }
        ObservationValue::Text(_) => None,
    };

    let mut resource = ObservationResource::new(
        id,
        obs.status,
        Coding {
            system: LOINC_SYSTEM.to_string(),
            code,
            display: Some(display),
        },
        subject,
    )
    .with_value(value);

    let effective = obs.observed_at_iso();
    if !effective.is_empty() {
        resource.effective_date_time = Some(effective);
    }

    if obs.reference_low.is_some() || obs.reference_high.is_some() {
        let bound = |raw: &Option<String>| {
            raw.as_deref().map(|raw| RangeBound {
                value: RangeValue::best_effort(raw),
            })
        };
        resource.reference_range.push(ReferenceRange {
            low: bound(&obs.reference_low),
            high: bound(&obs.reference_high),
        });
    }

    if let Some(code) = obs.flag.interpretation_code() {
        resource = resource.with_interpretation(code);
    }

    resource.note = obs
        .notes
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| Annotation { text: n.clone() })
        .collect();

    resource
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AbnormalFlag;
    use fhir::{AdministrativeGender, ObservationStatus, Resource};

    fn patient() -> Patient {
        Patient {
            id: "12345".into(),
            given_name: "JOHN".into(),
            family_name: "SMITH".into(),
            birth_date: "19800515".into(),
            sex: "M".into(),
        }
    }

    fn glucose() -> Observation {
        Observation {
            code: "2345-7".into(),
            display: "GLUCOSE".into(),
            value_type: "NM".into(),
            value: ObservationValue::Numeric(105.0),
            unit: "mg/dL".into(),
            reference_low: Some("70".into()),
            reference_high: Some("100".into()),
            flag: AbnormalFlag::Normal,
            observed_at: "20250122083000".into(),
            status: ObservationStatus::Final,
            ..Observation::default()
        }
    }

    #[test]
    fn builds_patient_then_sequential_observations() {
        let bundle = build_bundle(&patient(), &[glucose(), glucose()]).expect("bundle");
        let ids: Vec<&str> = bundle.entries().iter().map(|e| e.resource().id()).collect();
        assert_eq!(ids, vec!["12345", "obs-1", "obs-2"]);

        let patient = bundle.patient().expect("patient");
        assert_eq!(patient.birth_date.as_deref(), Some("1980-05-15"));
        assert_eq!(patient.gender, Some(AdministrativeGender::Male));
        assert_eq!(patient.name[0].family.as_deref(), Some("SMITH"));

        for obs in bundle.observations() {
            assert_eq!(obs.subject.reference, "Patient/12345");
        }
    }

    #[test]
    fn numeric_value_becomes_quantity() {
        let bundle = build_bundle(&patient(), &[glucose()]).expect("bundle");
        let json = serde_json::to_value(&bundle).expect("serialise");
        let obs = &json["entry"][1]["resource"];

        assert_eq!(obs["resourceType"], "Observation");
        assert_eq!(obs["valueQuantity"]["value"], 105.0);
        assert_eq!(obs["valueQuantity"]["unit"], "mg/dL");
        assert!(obs.get("valueString").is_none());
        assert_eq!(obs["referenceRange"][0]["low"]["value"], 70.0);
        assert_eq!(obs["referenceRange"][0]["high"]["value"], 100.0);
        assert_eq!(obs["interpretation"][0]["coding"][0]["code"], "N");
        assert_eq!(obs["effectiveDateTime"], "2025-01-22T08:30:00");
        assert_eq!(obs["code"]["coding"][0]["system"], LOINC_SYSTEM);
    }

    #[test]
    fn text_values_and_empty_values() {
        let text = Observation {
            code: "CULT".into(),
            display: "Culture".into(),
            value: ObservationValue::Text("No growth".into()),
            ..Observation::default()
        };
        let empty = Observation {
            code: "PEND".into(),
            display: "Pending".into(),
            ..Observation::default()
        };
        let bundle = build_bundle(&patient(), &[text, empty]).expect("bundle");
        let json = serde_json::to_value(&bundle).expect("serialise");

        assert_eq!(json["entry"][1]["resource"]["valueString"], "No growth");
        assert!(json["entry"][1]["resource"].get("valueQuantity").is_none());
        assert!(json["entry"][2]["resource"].get("valueString").is_none());
        assert!(json["entry"][2]["resource"].get("valueQuantity").is_none());
        assert!(json["entry"][2]["resource"].get("effectiveDateTime").is_none());
    }

    #[test]
    fn high_only_range_and_textual_bound() {
        let obs = Observation {
            code: "CHOL".into(),
            display: "Cholesterol".into(),
            value: ObservationValue::Numeric(180.0),
            reference_high: Some("<150".into()),
            flag: AbnormalFlag::High,
            ..Observation::default()
        };
        let bundle = build_bundle(&patient(), &[obs]).expect("bundle");
        let json = serde_json::to_value(&bundle).expect("serialise");
        let range = &json["entry"][1]["resource"]["referenceRange"][0];

        assert!(range.get("low").is_none());
        assert_eq!(range["high"]["value"], "<150");
        assert!(json["entry"][1]["resource"]["valueQuantity"].get("unit").is_none());
    }

    #[test]
    fn interpretation_only_for_high_low_normal() {
        let flagged = |flag| Observation {
            code: "X".into(),
            display: "X".into(),
            flag,
            ..Observation::default()
        };
        let bundle = build_bundle(
            &patient(),
            &[
                flagged(AbnormalFlag::Unflagged),
                flagged(AbnormalFlag::CriticalHigh),
                flagged(AbnormalFlag::Low),
            ],
        )
        .expect("bundle");
        let counts: Vec<usize> = bundle
            .observations()
            .map(|o| o.interpretation.len())
            .collect();
        assert_eq!(counts, vec![0, 0, 1]);
    }

    #[test]
    fn missing_identity_renders_unknown_code() {
        let bundle = build_bundle(&patient(), &[Observation::default()]).expect("bundle");
        let obs = bundle.observations().next().expect("observation");
        assert_eq!(obs.code.coding[0].code, UNKNOWN_CODE);
        assert_eq!(obs.code.coding[0].display.as_deref(), Some(UNKNOWN_CODE));
    }

    #[test]
    fn notes_become_annotations() {
        let obs = Observation {
            notes: vec!["Fasting sample".into()],
            ..glucose()
        };
        let bundle = build_bundle(&patient(), &[obs]).expect("bundle");
        match bundle.entries()[1].resource() {
            Resource::Observation(o) => assert_eq!(o.note[0].text, "Fasting sample"),
            other => panic!("expected Observation, got {other:?}"),
        }
    }

    #[test]
    fn bare_patient_omits_optional_members() {
        let bundle = build_bundle(&Patient::default(), &[]).expect("bundle");
        let json = serde_json::to_value(&bundle).expect("serialise");
        assert_eq!(json["entry"].as_array().map(Vec::len), Some(1));
        assert_eq!(
            json["entry"][0]["resource"],
            serde_json::json!({"resourceType": "Patient", "id": "patient-1"})
        );
    }

    #[test]
    fn building_twice_is_identical() {
        let first = build_bundle(&patient(), &[glucose()]).expect("bundle");
        let second = build_bundle(&patient(), &[glucose()]).expect("bundle");
        assert_eq!(first, second);
        assert_eq!(first.render().expect("render"), second.render().expect("render"));
    }
}
