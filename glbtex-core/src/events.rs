//! User-facing conversion events.
//!
//! Diagnostics go through `tracing`; what the user should see about a run
//! (texture recompressed, kept, failed, file written) is delivered as
//! [`LogEvent`]s to an [`EventSink`] as the run progresses.

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A single event. Timestamps are RFC 3339 in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,
    pub severity: Severity,
    pub timestamp: String,
}

impl LogEvent {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Receives events in emission order
pub trait EventSink {
    fn emit(&mut self, event: LogEvent);

    fn info(&mut self, message: &str) {
        self.emit(LogEvent::new(Severity::Info, message));
    }

    fn success(&mut self, message: &str) {
        self.emit(LogEvent::new(Severity::Success, message));
    }

    fn warning(&mut self, message: &str) {
        self.emit(LogEvent::new(Severity::Warning, message));
    }

    fn error(&mut self, message: &str) {
        self.emit(LogEvent::new(Severity::Error, message));
    }
}

/// Mirrors an event to `tracing` at the matching level
pub fn trace_event(event: &LogEvent) {
    match event.severity {
        Severity::Info | Severity::Success => tracing::info!(severity = event.severity.label(), "{}", event.message),
        Severity::Warning => tracing::warn!("{}", event.message),
        Severity::Error => tracing::error!("{}", event.message),
    }
}

/// Collects every event of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionLog {
    pub events: Vec<LogEvent>,
}

impl ConversionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.events.iter().filter(|e| e.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> + '_ {
        self.events.iter().map(|e| e.message.as_str())
    }
}

impl EventSink for ConversionLog {
    fn emit(&mut self, event: LogEvent) {
        trace_event(&event);
        self.events.push(event);
    }
}

/// Forwards events to a closure, e.g. to print them as they arrive
pub struct CallbackSink<F: FnMut(&LogEvent)> {
    callback: F,
}

impl<F: FnMut(&LogEvent)> CallbackSink<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: FnMut(&LogEvent)> EventSink for CallbackSink<F> {
    fn emit(&mut self, event: LogEvent) {
        (self.callback)(&event);
    }
}
