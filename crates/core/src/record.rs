//! The patient intake record and its capture surface.
//!
//! [`IntakeCapture`] is what an operator types: one free-form text per section plus the
//! OCR text of six lab slots. [`PatientIntakeRecord`] is the structured form persisted as the
//! JSON sidecar. `IntakeCapture::encode` and `PatientIntakeRecord::decode` convert between
//! the two.

use crate::codec::Section;
use crate::constants::{LAB_PREVIEW_MAX_CHARS, LAB_SLOT_COUNT, TRUNCATION_MARKER};
use crate::schema::{FieldSpec, CHIEF_COMPLAINT, CHIEF_COMPLAINT_KEY, LAB_KEY_PREFIX};
use crate::sections::{
    Allergies, AssistantNotes, Demographics, FamilyHistory, Immunization, LastVisit,
    Medications, PastMedicalHistory, PresentIllness, SocialHistory, Vitals,
};
use crate::{IntakeError, IntakeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured intake record, serialised as a flat JSON object.
///
/// Readers tolerate unknown keys and default missing keys to `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIntakeRecord {
    #[serde(flatten)]
    pub demographics: Demographics,
    #[serde(flatten)]
    pub vitals: Vitals,
    #[serde(rename = "ChiefComplaint", default)]
    pub chief_complaint: String,
    #[serde(flatten)]
    pub present_illness: PresentIllness,
    #[serde(flatten)]
    pub medications: Medications,
    #[serde(flatten)]
    pub social_history: SocialHistory,
    #[serde(flatten)]
    pub allergies: Allergies,
    #[serde(flatten)]
    pub family_history: FamilyHistory,
    #[serde(flatten)]
    pub past_medical_history: PastMedicalHistory,
    #[serde(flatten)]
    pub immunization: Immunization,
    #[serde(flatten)]
    pub last_visit: LastVisit,
    #[serde(flatten)]
    pub assistant_notes: AssistantNotes,
    #[serde(flatten)]
    pub labs: LabResults,
}

/// OCR text of the six lab slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabResults {
    #[serde(rename = "LabExtractedText1")]
    pub slot_1: String,
    #[serde(rename = "LabExtractedText2")]
    pub slot_2: String,
    #[serde(rename = "LabExtractedText3")]
    pub slot_3: String,
    #[serde(rename = "LabExtractedText4")]
    pub slot_4: String,
    #[serde(rename = "LabExtractedText5")]
    pub slot_5: String,
    #[serde(rename = "LabExtractedText6")]
    pub slot_6: String,
}

impl LabResults {
    pub fn from_slots(slots: [String; LAB_SLOT_COUNT]) -> Self {
        let [slot_1, slot_2, slot_3, slot_4, slot_5, slot_6] = slots;
        Self {
            slot_1,
            slot_2,
            slot_3,
            slot_4,
            slot_5,
            slot_6,
        }
    }

    pub fn slots(&self) -> [&str; LAB_SLOT_COUNT] {
        [
            &self.slot_1,
            &self.slot_2,
            &self.slot_3,
            &self.slot_4,
            &self.slot_5,
            &self.slot_6,
        ]
    }
}

/// A lab slot number, validated to `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabSlot(u8);

impl LabSlot {
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidInput` for a slot outside `1..=6`.
    pub fn new(slot: u8) -> IntakeResult<Self> {
        if (1..=LAB_SLOT_COUNT as u8).contains(&slot) {
            Ok(Self(slot))
        } else {
            Err(IntakeError::InvalidInput(format!(
                "lab slot must be between 1 and {LAB_SLOT_COUNT}, got {slot}"
            )))
        }
    }

    /// Slots 1 to 6 in order.
    pub fn all() -> impl Iterator<Item = LabSlot> {
        (1..=LAB_SLOT_COUNT as u8).map(LabSlot)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Capture key of the slot (`lab-1` .. `lab-6`).
    pub fn capture_key(self) -> String {
        format!("{LAB_KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for LabSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cuts `text` to the preview budget, marking the cut.
pub fn truncate_for_preview(text: &str) -> String {
    match text.char_indices().nth(LAB_PREVIEW_MAX_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Raw capture text, one entry per section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeCapture {
    pub demographics: String,
    pub vitals: String,
    pub chief_complaint: String,
    pub present_illness: String,
    pub medications: String,
    pub social_history: String,
    pub allergies: String,
    pub family_history: String,
    pub past_medical_history: String,
    pub immunization: String,
    pub last_visit: String,
    pub assistant_notes: String,
    pub labs: [String; LAB_SLOT_COUNT],
}

impl IntakeCapture {
    /// Encodes every section and normalises the BMI.
    pub fn encode(&self) -> PatientIntakeRecord {
        let mut vitals = Vitals::encode(&self.vitals);
        vitals.normalize_bmi();

        PatientIntakeRecord {
            demographics: Demographics::encode(&self.demographics),
            vitals,
            chief_complaint: self.chief_complaint.trim().to_string(),
            present_illness: PresentIllness::encode(&self.present_illness),
            medications: Medications::encode(&self.medications),
            social_history: SocialHistory::encode(&self.social_history),
            allergies: Allergies::encode(&self.allergies),
            family_history: FamilyHistory::encode(&self.family_history),
            past_medical_history: PastMedicalHistory::encode(&self.past_medical_history),
            immunization: Immunization::encode(&self.immunization),
            last_visit: LastVisit::encode(&self.last_visit),
            assistant_notes: AssistantNotes::encode(&self.assistant_notes),
            labs: LabResults::from_slots(self.labs.clone()),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Name and date of birth as typed on demographics lines 1 and 2 (possibly empty).
    pub fn patient_name_and_dob(&self) -> (String, String) {
        let mut lines = crate::codec::split_lines(&self.demographics).into_iter();
        let name = lines.next().unwrap_or_default().trim().to_string();
        let dob = lines.next().unwrap_or_default().trim().to_string();
        (name, dob)
    }

    pub fn lab(&self, slot: LabSlot) -> &str {
        &self.labs[slot.index()]
    }

    pub fn set_lab(&mut self, slot: LabSlot, text: String) {
        self.labs[slot.index()] = text;
    }

    /// Mutable access by capture key (`demographics`, `chief-complaint`, `lab-3`, ...).
    pub fn text_mut(&mut self, key: &str) -> Option<&mut String> {
        if let Some(n) = key.strip_prefix(LAB_KEY_PREFIX) {
            let slot = n.parse::<u8>().ok().and_then(|n| LabSlot::new(n).ok())?;
            return Some(&mut self.labs[slot.index()]);
        }

        let text = match key {
            "demographics" => &mut self.demographics,
            "vitals" => &mut self.vitals,
            CHIEF_COMPLAINT_KEY => &mut self.chief_complaint,
            "history" => &mut self.present_illness,
            "medications" => &mut self.medications,
            "social-history" => &mut self.social_history,
            "allergies" => &mut self.allergies,
            "family-history" => &mut self.family_history,
            "past-medical-history" => &mut self.past_medical_history,
            "immunization" => &mut self.immunization,
            "last-visit" => &mut self.last_visit,
            "assistant-notes" => &mut self.assistant_notes,
            _ => return None,
        };
        Some(text)
    }

    /// Every capture text keyed by its capture key, in capture order.
    pub fn entries(&self) -> Vec<(String, &str)> {
        let sections = [
            (Demographics::SCHEMA.key, &self.demographics),
            (Vitals::SCHEMA.key, &self.vitals),
            (CHIEF_COMPLAINT_KEY, &self.chief_complaint),
            (PresentIllness::SCHEMA.key, &self.present_illness),
            (Medications::SCHEMA.key, &self.medications),
            (SocialHistory::SCHEMA.key, &self.social_history),
            (Allergies::SCHEMA.key, &self.allergies),
            (FamilyHistory::SCHEMA.key, &self.family_history),
            (PastMedicalHistory::SCHEMA.key, &self.past_medical_history),
            (Immunization::SCHEMA.key, &self.immunization),
            (LastVisit::SCHEMA.key, &self.last_visit),
            (AssistantNotes::SCHEMA.key, &self.assistant_notes),
        ];

        sections
            .into_iter()
            .map(|(key, text)| (key.to_string(), text.as_str()))
            .chain(LabSlot::all().map(|slot| (slot.capture_key(), self.lab(slot))))
            .collect()
    }
}

/// A labelled field value, as shown in rendered documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordField<'a> {
    pub label: &'static str,
    pub value: &'a str,
}

impl PatientIntakeRecord {
    /// Rebuilds the capture text of every section.
    pub fn decode(&self) -> IntakeCapture {
        IntakeCapture {
            demographics: self.demographics.decode(),
            vitals: self.vitals.decode(),
            chief_complaint: self.chief_complaint.clone(),
            present_illness: self.present_illness.decode(),
            medications: self.medications.decode(),
            social_history: self.social_history.decode(),
            allergies: self.allergies.decode(),
            family_history: self.family_history.decode(),
            past_medical_history: self.past_medical_history.decode(),
            immunization: self.immunization.decode(),
            last_visit: self.last_visit.decode(),
            assistant_notes: self.assistant_notes.decode(),
            labs: self.labs.slots().map(str::to_string),
        }
    }

    /// Every field with its label, in schema order (chief complaint after vitals, labs last).
    pub fn fields(&self) -> Vec<RecordField<'_>> {
        fn labelled<'a>(entries: Vec<(FieldSpec, &'a str)>) -> Vec<RecordField<'a>> {
            entries
                .into_iter()
                .map(|(spec, value)| RecordField {
                    label: spec.label,
                    value,
                })
                .collect()
        }

        let mut out = labelled(self.demographics.entries());
        out.extend(labelled(self.vitals.entries()));
        out.push(RecordField {
            label: CHIEF_COMPLAINT.label,
            value: &self.chief_complaint,
        });
        out.extend(labelled(self.present_illness.entries()));
        out.extend(labelled(self.medications.entries()));
        out.extend(labelled(self.social_history.entries()));
        out.extend(labelled(self.allergies.entries()));
        out.extend(labelled(self.family_history.entries()));
        out.extend(labelled(self.past_medical_history.entries()));
        out.extend(labelled(self.immunization.entries()));
        out.extend(labelled(self.last_visit.entries()));
        out.extend(labelled(self.assistant_notes.entries()));
        out.extend(
            self.labs
                .slots()
                .into_iter()
                .zip(LAB_LABELS)
                .map(|(value, label)| RecordField { label, value }),
        );
        out
    }
}

const LAB_LABELS: [&str; LAB_SLOT_COUNT] = [
    "Lab Result 1",
    "Lab Result 2",
    "Lab Result 3",
    "Lab Result 4",
    "Lab Result 5",
    "Lab Result 6",
];

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_capture() -> IntakeCapture {
        IntakeCapture {
            demographics: "Maria Reyes\n1978-03-14\nF\n12 Elm St\n555-0101\nmaria@example.com\nJuan Reyes\n555-0102\nprefers Spanish\nwheelchair access".into(),
            vitals: "120/80\n72\n16\n36.8\n98%\n170cm\n70kg\n".into(),
            chief_complaint: "  chest pain since Monday \n".into(),
            present_illness: "2026-01-03\n3 days".into(),
            medications: "lisinopril\nibuprofen\nvitamin D\nstopped metformin".into(),
            allergies: "penicillin".into(),
            labs: [
                "Hb 13.2".into(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                "LDL 3.1".into(),
            ],
            ..IntakeCapture::default()
        }
    }

    #[test]
    fn encode_maps_lines_overflow_and_bmi() {
        let record = sample_capture().encode();

        assert_eq!(record.demographics.full_name, "Maria Reyes");
        assert_eq!(record.demographics.contact_number, "555-0102");
        assert_eq!(
            record.demographics.additional_notes,
            "prefers Spanish\nwheelchair access"
        );
        assert_eq!(record.vitals.bmi, "24.2");
        assert_eq!(record.chief_complaint, "chest pain since Monday");
        assert_eq!(record.present_illness.severity, "N/A");
        assert_eq!(record.medications.additional_notes, "stopped metformin");
        assert_eq!(record.social_history.smoking_status, "");
        assert_eq!(record.labs.slot_6, "LDL 3.1");
    }

    #[test]
    fn decode_then_encode_is_stable() {
        let first = sample_capture().encode();
        let second = first.decode().encode();
        assert_eq!(first, second);
    }

    #[test]
    fn sidecar_uses_flat_pascal_case_keys() {
        let record = sample_capture().encode();
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object["FullName"], "Maria Reyes");
        assert_eq!(object["BMI"], "24.2");
        assert_eq!(object["OTCMeds"], "ibuprofen");
        assert_eq!(object["ChiefComplaint"], "chest pain since Monday");
        assert_eq!(object["LabExtractedText1"], "Hb 13.2");
        assert!(object.values().all(|v| v.is_string()));
    }

    #[test]
    fn missing_and_unknown_keys_are_tolerated() {
        let record: PatientIntakeRecord = serde_json::from_str(
            r#"{ "FullName": "Maria Reyes", "FavouriteColour": "blue", "LabExtractedText2": "K 4.1" }"#,
        )
        .unwrap();

        assert_eq!(record.demographics.full_name, "Maria Reyes");
        assert_eq!(record.demographics.date_of_birth, "");
        assert_eq!(record.chief_complaint, "");
        assert_eq!(record.labs.slot_2, "K 4.1");
    }

    #[test]
    fn lab_slots_are_validated() {
        assert!(LabSlot::new(0).is_err());
        assert!(LabSlot::new(7).is_err());
        let slot = LabSlot::new(6).unwrap();
        assert_eq!(slot.capture_key(), "lab-6");

        let mut capture = IntakeCapture::default();
        capture.set_lab(slot, "LDL 3.1".into());
        assert_eq!(capture.lab(slot), "LDL 3.1");
        assert_eq!(capture.text_mut("lab-6").map(|s| s.as_str()), Some("LDL 3.1"));
        assert!(capture.text_mut("lab-9").is_none());
        assert!(capture.text_mut("unknown").is_none());
    }

    #[test]
    fn preview_is_truncated_by_characters() {
        let short = "é".repeat(LAB_PREVIEW_MAX_CHARS);
        assert_eq!(truncate_for_preview(&short), short);

        let long = "é".repeat(LAB_PREVIEW_MAX_CHARS + 1);
        let preview = truncate_for_preview(&long);
        assert!(preview.ends_with("\n... (truncated)"));
        assert_eq!(
            preview.chars().count(),
            LAB_PREVIEW_MAX_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn name_and_dob_come_from_the_first_two_lines() {
        let capture = sample_capture();
        assert_eq!(
            capture.patient_name_and_dob(),
            ("Maria Reyes".to_string(), "1978-03-14".to_string())
        );
        assert_eq!(
            IntakeCapture::default().patient_name_and_dob(),
            (String::new(), String::new())
        );
    }

    #[test]
    fn clear_resets_everything() {
        let mut capture = sample_capture();
        capture.clear();
        assert_eq!(capture, IntakeCapture::default());
    }

    #[test]
    fn fields_cover_every_key() {
        let record = PatientIntakeRecord::default();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(record.fields().len(), value.as_object().unwrap().len());
    }

    fn single_line() -> impl Strategy<Value = String> {
        "[ a-zA-Z0-9/.,:%-]{0,12}"
    }

    fn section_text() -> impl Strategy<Value = String> {
        prop::collection::vec(single_line(), 0..12).prop_map(|lines| lines.join("\n"))
    }

    proptest! {
        #[test]
        fn encoding_stabilises_for_any_capture(
            demographics in section_text(),
            vitals in section_text(),
            chief in single_line(),
            history in section_text(),
            medications in section_text(),
            notes in section_text(),
        ) {
            let capture = IntakeCapture {
                demographics,
                vitals,
                chief_complaint: chief,
                present_illness: history,
                medications,
                assistant_notes: notes,
                ..IntakeCapture::default()
            };

            let first = capture.encode();
            let second = first.decode().encode();
            prop_assert_eq!(&first, &second);

            let decoded = first.decode();
            prop_assert_eq!(decoded.encode().decode(), decoded);
        }
    }
}
