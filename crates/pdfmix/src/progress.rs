//! Progress events emitted while converting, merging and extracting.
//!
//! The library never renders anything itself. Callers pass a
//! [`ProgressSink`] and decide how to display the events (the CLI draws a
//! bar on stderr, tests usually collect them into a `Vec`).

use serde::Serialize;
use std::sync::Mutex;

/// Whether a stage knows how much work is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// `current` out of `total` is meaningful.
    Determinate,
    /// Only "something is happening" is known.
    Indeterminate,
}

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Stage label, e.g. `"Conversion"` or `"Merging"`.
    pub stage: String,
    /// Determinate or indeterminate.
    pub mode: ProgressMode,
    /// Units done so far.
    pub current: usize,
    /// Units in total.
    pub total: usize,
    /// File currently being worked on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Free-form human message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    /// A determinate step.
    pub fn determinate(stage: impl Into<String>, current: usize, total: usize) -> Self {
        Self {
            stage: stage.into(),
            mode: ProgressMode::Determinate,
            current,
            total,
            filename: None,
            message: None,
        }
    }

    /// An indeterminate notification.
    pub fn indeterminate(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            mode: ProgressMode::Indeterminate,
            current: 0,
            total: 0,
            filename: None,
            message: Some(message.into()),
        }
    }

    /// Attach the file being processed.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Completion as a percentage, `None` for indeterminate events.
    pub fn percent(&self) -> Option<u8> {
        match self.mode {
            ProgressMode::Indeterminate => None,
            ProgressMode::Determinate if self.total == 0 => Some(100),
            ProgressMode::Determinate => {
                let pct = (self.current.min(self.total) * 100) / self.total;
                Some(pct as u8)
            }
        }
    }

    /// Whether this is a determinate event.
    pub fn is_determinate(&self) -> bool {
        self.mode == ProgressMode::Determinate
    }
}

/// Receiver for progress events.
///
/// Implementations must be cheap; events are emitted synchronously from
/// the conversion and merge loops.
pub trait ProgressSink: Send + Sync {
    /// Handle one event.
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Sink that records every event, mostly useful in tests.
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Recorded events for one stage.
    pub fn stage(&self, stage: &str) -> Vec<ProgressEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.stage == stage)
            .collect()
    }
}

impl ProgressSink for ProgressLog {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
