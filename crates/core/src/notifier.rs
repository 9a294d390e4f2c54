//! Error notifier.
//!
//! Collapses bursts of identical failures into one visible notification. One instance is
//! built per process and shared through an `Arc`; notifications may arrive from concurrent
//! task completions, so the `(last key, last time)` pair sits behind a mutex.

use parking_lot::Mutex;
use std::fmt::Display;
use std::time::{Duration, Instant};

/// Where visible notifications go.
pub trait NotificationSink: Send + Sync {
    fn show(&self, key: &str, message: &str);
}

pub struct ErrorNotifier {
    window: Duration,
    sink: Box<dyn NotificationSink>,
    last: Mutex<Option<(String, Instant)>>,
}

impl ErrorNotifier {
    pub fn new(window: Duration, sink: Box<dyn NotificationSink>) -> Self {
        Self {
            window,
            sink,
            last: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Shows `error` under `key` unless the same key was shown within the window.
    ///
    /// Returns whether the notification was shown.
    pub fn notify(&self, key: &str, error: impl Display) -> bool {
        self.notify_at(key, error, Instant::now())
    }

    /// As [`ErrorNotifier::notify`], at an explicit instant.
    ///
    /// A suppressed notification does not extend the window.
    pub fn notify_at(&self, key: &str, error: impl Display, now: Instant) -> bool {
        let mut last = self.last.lock();

        if let Some((last_key, last_at)) = last.as_ref() {
            if last_key == key && now.saturating_duration_since(*last_at) < self.window {
                tracing::debug!(key, "notification suppressed");
                return false;
            }
        }

        *last = Some((key.to_string(), now));
        drop(last);

        self.sink
            .show(key, &format!("An error occurred in: {key}\n\n{error}"));
        true
    }
}

impl std::fmt::Debug for ErrorNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorNotifier")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
