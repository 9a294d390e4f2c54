//! Record sections.
//!
//! Every section struct is generated by [`ordinal_section!`] from one field table, which
//! yields the serde key, the schema entry and the ordinal position of each field at once.

use crate::codec::{EncodedSection, Section};
use crate::schema::{FieldSpec, SectionSchema};
use crate::units::compute_bmi_or_fallback;
use serde::{Deserialize, Serialize};

macro_rules! ordinal_section {
    (
        $(#[$meta:meta])*
        $name:ident ($key:literal, $title:literal) {
            $( $field:ident => $json:literal, $label:literal; )+
        }
        overflow $ofield:ident => $ojson:literal, $olabel:literal;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            $(
                #[serde(rename = $json)]
                pub $field: String,
            )+
            #[serde(rename = $ojson)]
            pub $ofield: String,
        }

        impl Section for $name {
            const SCHEMA: SectionSchema = SectionSchema {
                key: $key,
                title: $title,
                fields: &[ $( FieldSpec { key: $json, label: $label }, )+ ],
                overflow: FieldSpec { key: $ojson, label: $olabel },
            };

            fn ordinals(&self) -> Vec<&str> {
                vec![ $( self.$field.as_str(), )+ ]
            }

            fn overflow(&self) -> &str {
                &self.$ofield
            }

            fn from_encoded(encoded: EncodedSection) -> Self {
                let mut fields = encoded.fields.into_iter();
                Self {
                    $( $field: fields.next().unwrap_or_default(), )+
                    $ofield: encoded.overflow,
                }
            }
        }
    };
}

ordinal_section! {
    Demographics ("demographics", "Demographics") {
        full_name => "FullName", "Full Name";
        date_of_birth => "DateOfBirth", "Date of Birth";
        gender => "Gender", "Gender";
        address => "Address", "Address";
        phone_number => "PhoneNumber", "Phone Number";
        email => "Email", "Email";
        contact_person => "ContactPerson", "Contact Person";
        contact_number => "ContactNumber", "Contact Number";
    }
    overflow additional_notes => "AdditionalDemographicsNotes", "Additional Demographics Notes";
}

ordinal_section! {
    /// Vital signs. The eighth line is a BMI fallback; see [`Vitals::normalize_bmi`].
    Vitals ("vitals", "Vital Signs") {
        blood_pressure => "BloodPressure", "Blood Pressure";
        heart_rate => "HeartRate", "Heart Rate";
        respiratory_rate => "RespiratoryRate", "Respiratory Rate";
        temperature => "Temperature", "Temperature";
        spo2 => "SpO2", "SpO2";
        height => "Height", "Height";
        weight => "Weight", "Weight";
        bmi => "BMI", "BMI";
    }
    overflow additional_notes => "AdditionalVitalNotes", "Additional Vital Notes";
}

impl Vitals {
    /// Replaces `bmi` with the value computed from height and weight, keeping the captured
    /// BMI line as the fallback.
    pub fn normalize_bmi(&mut self) {
        self.bmi = compute_bmi_or_fallback(&self.height, &self.weight, &self.bmi);
    }
}

ordinal_section! {
    PresentIllness ("history", "History of Present Illness") {
        onset_date => "OnsetDate", "Onset Date";
        duration => "Duration", "Duration";
        severity => "Severity", "Severity";
        location => "Location", "Location";
        associated_symptoms => "AssociatedSymptoms", "Associated Symptoms";
    }
    overflow additional_notes => "AdditionalHistoryNotes", "Additional History Notes";
}

ordinal_section! {
    Medications ("medications", "Medications") {
        medications => "Medications", "Medications";
        otc_meds => "OTCMeds", "OTC Medications";
        supplements => "Supplements", "Supplements";
    }
    overflow additional_notes => "AdditionalMedicationNotes", "Additional Medication Notes";
}

ordinal_section! {
    SocialHistory ("social-history", "Social History") {
        smoking_status => "SmokingStatus", "Smoking Status";
        alcohol_use => "AlcoholUse", "Alcohol Use";
        drug_use => "DrugUse", "Drug Use";
    }
    overflow additional_notes => "AdditionalSocialNotes", "Additional Social Notes";
}

ordinal_section! {
    Allergies ("allergies", "Allergies") {
        allergies => "Allergies", "Allergies";
    }
    overflow additional_notes => "AdditionalAllergyNotes", "Additional Allergy Notes";
}

ordinal_section! {
    FamilyHistory ("family-history", "Family History") {
        notable_history => "NotableFamilyMedicalHistory", "Notable Family Medical History";
    }
    overflow additional_notes => "AdditionalFamilyHistoryNotes", "Additional Family History Notes";
}

ordinal_section! {
    PastMedicalHistory ("past-medical-history", "Past Medical History") {
        history => "PastMedicalHistory", "Past Medical History";
    }
    overflow additional_notes => "AdditionalPastMedicalNotes", "Additional Past Medical Notes";
}

ordinal_section! {
    Immunization ("immunization", "Immunization") {
        history => "ImmunizationHistory", "Immunization History";
    }
    overflow additional_notes => "AdditionalImmunizationNotes", "Additional Immunization Notes";
}

ordinal_section! {
    LastVisit ("last-visit", "Last Clinic Visit") {
        notes => "LastClinicVisitNotes", "Last Clinic Visit Notes";
    }
    overflow additional_notes => "AdditionalLastClinicVisitNotes", "Additional Last Clinic Visit Notes";
}

ordinal_section! {
    AssistantNotes ("assistant-notes", "Medical Assistant Notes") {
        notes => "MedicalAssistantNotes", "Medical Assistant Notes";
    }
    overflow additional_notes => "AdditionalMedicalAssistantNotes", "Additional Medical Assistant Notes";
}

/// Layouts of every ordinal section, in capture order.
pub const SECTIONS: &[SectionSchema] = &[
    Demographics::SCHEMA,
    Vitals::SCHEMA,
    PresentIllness::SCHEMA,
    Medications::SCHEMA,
    SocialHistory::SCHEMA,
    Allergies::SCHEMA,
    FamilyHistory::SCHEMA,
    PastMedicalHistory::SCHEMA,
    Immunization::SCHEMA,
    LastVisit::SCHEMA,
    AssistantNotes::SCHEMA,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ordinal_counts_are_fixed() {
        let counts: Vec<(&str, usize)> = SECTIONS
            .iter()
            .map(|s| (s.key, s.ordinal_count()))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("demographics", 8),
                ("vitals", 8),
                ("history", 5),
                ("medications", 3),
                ("social-history", 3),
                ("allergies", 1),
                ("family-history", 1),
                ("past-medical-history", 1),
                ("immunization", 1),
                ("last-visit", 1),
                ("assistant-notes", 1),
            ]
        );
    }

    #[test]
    fn sidecar_keys_are_unique() {
        let mut seen = HashSet::new();
        for schema in SECTIONS {
            for spec in schema.fields.iter().chain(std::iter::once(&schema.overflow)) {
                assert!(seen.insert(spec.key), "duplicate key {}", spec.key);
            }
        }
    }

    #[test]
    fn serde_keys_follow_the_schema() {
        let demographics = Demographics::encode("Maria Reyes\n1978-03-14");
        let value = serde_json::to_value(&demographics).unwrap();
        let object = value.as_object().unwrap();

        let expected: Vec<&str> = Demographics::SCHEMA
            .fields
            .iter()
            .map(|f| f.key)
            .chain(std::iter::once(Demographics::SCHEMA.overflow.key))
            .collect();
        assert_eq!(object.len(), expected.len());
        for key in expected {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(object["FullName"], "Maria Reyes");
        assert_eq!(object["Gender"], "N/A");
    }

    #[test]
    fn vitals_bmi_is_computed_with_captured_line_as_fallback() {
        let mut vitals = Vitals::encode("120/80\n72\n16\n36.8\n98%\n170cm\n70kg\n99.9");
        vitals.normalize_bmi();
        assert_eq!(vitals.bmi, "24.2");

        let mut vitals = Vitals::encode("120/80\n72\n16\n36.8\n98%\n\n\n22.0");
        vitals.normalize_bmi();
        assert_eq!(vitals.bmi, "22.0");

        let mut vitals = Vitals::encode("120/80");
        vitals.normalize_bmi();
        assert_eq!(vitals.bmi, "N/A");
    }
}
