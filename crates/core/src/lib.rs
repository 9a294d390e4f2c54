//! # Intake Core
//!
//! Core logic of the patient intake records workflow.
//!
//! This crate turns free-form, multi-line intake text into a structured record, normalises
//! height/weight into a BMI, persists the record losslessly as a JSON sidecar beside a
//! rendered document, and loads exactly the same record back later:
//!
//! - [`units`]: height/weight parsing and BMI
//! - [`codec`] and [`sections`]: positional section encoding against a versioned [`schema`]
//! - [`record`]: the record and its capture surface
//! - [`store`]: the document/sidecar pair on disk
//! - [`selector`]: the pick/preview/confirm loop
//! - [`notifier`]: throttled error notifications
//! - [`service`]: the command handlers a presentation layer calls
//!
//! **No UI concerns**: prompts and notification display are traits implemented by the
//! presentation layer. Remote collaborators live in `intake-remote`.

pub mod codec;
pub mod collaborators;
pub mod config;
pub mod constants;
mod error;
pub mod notifier;
pub mod record;
pub mod render;
pub mod schema;
pub mod sections;
pub mod selector;
pub mod service;
pub mod store;
pub mod units;

pub use codec::{decode_section, encode_section, EncodedSection, Section};
pub use collaborators::{
    CollaboratorError, CollaboratorResult, DocumentRenderer, ReportEnhancer, TextExtractor,
};
pub use config::IntakeConfig;
pub use error::{IntakeError, IntakeResult};
pub use notifier::{ErrorNotifier, NotificationSink};
pub use record::{IntakeCapture, LabSlot, PatientIntakeRecord};
pub use render::PdfSummaryRenderer;
pub use schema::{SCHEMA_VERSION, PLACEHOLDER};
pub use selector::{PreviewDecision, RecordSelector, Selection, SelectorPrompt, SelectorState};
pub use service::{IntakeService, LabAttachment, LoadedIntake, ReportOutcome, SaveOutcome};
pub use store::{PickerFilter, RecordStore, SavedRecord};
pub use units::{compute_bmi_or_fallback, UnitError};
