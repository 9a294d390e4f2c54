//! Record selector.
//!
//! Drives the pick/preview/confirm loop an operator goes through before a stored record is
//! loaded:
//!
//! ```text
//! Browsing --pick--> Previewing --UseThis--> Done
//!    |                  |  \--Retry--> Browsing
//!    \--cancel--> Terminated <--Cancel--/
//! ```
//!
//! The selector owns no UI type; the presentation layer supplies a [`SelectorPrompt`].

use std::path::{Path, PathBuf};

/// Operator decision on a previewed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewDecision {
    UseThis,
    Retry,
    Cancel,
}

/// What the selector needs from the presentation layer.
pub trait SelectorPrompt {
    /// Offers the candidates; `None` means the operator cancelled.
    fn pick(&mut self, candidates: &[PathBuf]) -> Option<PathBuf>;

    /// Shows the picked document and asks what to do with it.
    fn preview(&mut self, document: &Path) -> PreviewDecision;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorState {
    Browsing,
    Previewing(PathBuf),
    Done(PathBuf),
    Terminated,
}

impl SelectorState {
    pub fn is_final(&self) -> bool {
        matches!(self, SelectorState::Done(_) | SelectorState::Terminated)
    }
}

/// Outcome of a full selector run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    Loaded { document: PathBuf, value: T },
    Cancelled,
}

#[derive(Debug)]
pub struct RecordSelector {
    candidates: Vec<PathBuf>,
    state: SelectorState,
}

impl RecordSelector {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            state: SelectorState::Browsing,
        }
    }

    pub fn state(&self) -> &SelectorState {
        &self.state
    }

    /// Advances one transition. Final states do not move.
    pub fn step(&mut self, prompt: &mut dyn SelectorPrompt) -> &SelectorState {
        let next = match std::mem::replace(&mut self.state, SelectorState::Terminated) {
            SelectorState::Browsing => match prompt.pick(&self.candidates) {
                Some(document) => SelectorState::Previewing(document),
                None => SelectorState::Terminated,
            },
            SelectorState::Previewing(document) => match prompt.preview(&document) {
                PreviewDecision::UseThis => SelectorState::Done(document),
                PreviewDecision::Retry => SelectorState::Browsing,
                PreviewDecision::Cancel => SelectorState::Terminated,
            },
            done => done,
        };
        self.state = next;
        &self.state
    }

    /// Runs until a final state and calls `load` exactly once if a document was accepted.
    ///
    /// # Errors
    ///
    /// Propagates the error of `load`.
    pub fn run<T, E>(
        mut self,
        prompt: &mut dyn SelectorPrompt,
        load: impl FnOnce(&Path) -> Result<T, E>,
    ) -> Result<Selection<T>, E> {
        while !self.state.is_final() {
            self.step(prompt);
        }

        match self.state {
            SelectorState::Done(document) => {
                let value = load(&document)?;
                Ok(Selection::Loaded { document, value })
            }
            _ => Ok(Selection::Cancelled),
        }
    }
}
