//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! while handling commands, which leads to inconsistent behaviour in tests.

use crate::constants::{AI_REPORT_DIR_NAME, LAB_RESULTS_DIR_NAME, PATIENTS_DIR_NAME};
use crate::{IntakeError, IntakeResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct IntakeConfig {
    records_dir: PathBuf,
    notify_window: Duration,
    remote_timeout: Duration,
}

impl IntakeConfig {
    /// Create a new `IntakeConfig`.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidInput` if `records_dir` is empty or `remote_timeout` is zero.
    pub fn new(
        records_dir: PathBuf,
        notify_window: Duration,
        remote_timeout: Duration,
    ) -> IntakeResult<Self> {
        if records_dir.as_os_str().is_empty() {
            return Err(IntakeError::InvalidInput(
                "records_dir cannot be empty".into(),
            ));
        }

        if remote_timeout.is_zero() {
            return Err(IntakeError::InvalidInput(
                "remote_timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            records_dir,
            notify_window,
            remote_timeout,
        })
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.records_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn ai_report_dir(&self) -> PathBuf {
        self.records_dir.join(AI_REPORT_DIR_NAME)
    }

    pub fn lab_results_dir(&self) -> PathBuf {
        self.records_dir.join(LAB_RESULTS_DIR_NAME)
    }

    pub fn notify_window(&self) -> Duration {
        self.notify_window
    }

    pub fn remote_timeout(&self) -> Duration {
        self.remote_timeout
    }
}
