//! Event logging for the analysis pipeline.
//!
//! Every analysis-relevant occurrence (a graph being built, an analysis starting or
//! finishing, a function skipped because its CFG is unavailable) is recorded in an
//! [`EventLog`]. The log is append-only and can be shared across the rayon workers that run
//! intraprocedural analyses. Each recorded event is also forwarded to `tracing`.
//!
//! # Architecture
//!
//! - [`Event`] - A single recorded event
//! - [`EventLog`] - Lock-free collection of events with query and summary helpers
//! - [`EventBuilder`] - Fluent API; the event is recorded when the builder is dropped
//!
//! # Example
//!
//! ```rust
//! use midend::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::CfgUnavailable).message("add: no CFG");
//! log.info("starting interprocedural constant propagation");
//!
//! assert_eq!(log.omissions().count(), 1);
//! assert_eq!(log.len(), 2);
//! ```

use std::{collections::HashMap, fmt};

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::ir::{FuncId, StmtId};

/// Kinds of events recorded during an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum EventKind {
    /// A per-function CFG was built
    #[strum(to_string = "cfg built")]
    CfgBuilt,
    /// The call graph was built
    #[strum(to_string = "call graph built")]
    CallGraphBuilt,
    /// The ICFG was built
    #[strum(to_string = "icfg built")]
    IcfgBuilt,
    /// A reachable function was left out of the ICFG because its CFG is unavailable
    #[strum(to_string = "cfg unavailable")]
    CfgUnavailable,
    /// Call and return edges of a call site were left out because the callee's CFG is
    /// unavailable
    #[strum(to_string = "call edges omitted")]
    CallEdgesOmitted,
    /// An analysis started
    #[strum(to_string = "analysis started")]
    AnalysisStarted,
    /// An analysis finished and published its result
    #[strum(to_string = "analysis completed")]
    AnalysisCompleted,
    /// A solver reached its fixpoint
    #[strum(to_string = "fixpoint reached")]
    FixpointReached,
    /// A debug dump was written
    #[strum(to_string = "dump written")]
    DumpWritten,
    /// Informational message
    #[strum(to_string = "info")]
    Info,
    /// Warning message
    #[strum(to_string = "warning")]
    Warning,
    /// Error message
    #[strum(to_string = "error")]
    Error,
}

impl EventKind {
    /// Returns `true` for events marking a deliberate under-approximation of the program.
    #[must_use]
    pub fn is_omission(self) -> bool {
        matches!(self, Self::CfgUnavailable | Self::CallEdgesOmitted)
    }

    /// Returns `true` for omissions and free-form info/warning/error messages.
    #[must_use]
    pub fn is_diagnostic(self) -> bool {
        self.is_omission() || matches!(self, Self::Info | Self::Warning | Self::Error)
    }
}

/// A single recorded event.
#[derive(Debug, Clone)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// The function concerned, if any.
    pub function: Option<FuncId>,
    /// The statement concerned, if any.
    pub location: Option<StmtId>,
    /// Human-readable description.
    pub message: String,
    /// Identifier of the analysis that recorded the event.
    pub analysis: Option<String>,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            function: None,
            location: None,
            message: message.into(),
            analysis: None,
        }
    }

    fn trace(&self) {
        match self.kind {
            EventKind::Error => tracing::error!(
                kind = %self.kind,
                function = ?self.function,
                location = ?self.location,
                analysis = ?self.analysis,
                "{}",
                self.message
            ),
            kind if kind.is_omission() || kind == EventKind::Warning => tracing::warn!(
                kind = %self.kind,
                function = ?self.function,
                location = ?self.location,
                analysis = ?self.analysis,
                "{}",
                self.message
            ),
            EventKind::Info => tracing::info!(
                kind = %self.kind,
                function = ?self.function,
                location = ?self.location,
                analysis = ?self.analysis,
                "{}",
                self.message
            ),
            _ => tracing::debug!(
                kind = %self.kind,
                function = ?self.function,
                location = ?self.location,
                analysis = ?self.analysis,
                "{}",
                self.message
            ),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(function) = self.function {
            write!(f, " {function}")?;
            if let Some(location) = self.location {
                write!(f, "@{location}")?;
            }
        }
        write!(f, " {}", self.message)
    }
}

/// Fluent builder returned by [`EventLog::record`]. Records the event on drop.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    function: Option<FuncId>,
    location: Option<StmtId>,
    message: Option<String>,
    analysis: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            function: None,
            location: None,
            message: None,
            analysis: None,
        }
    }

    /// Sets function and statement.
    pub fn at(mut self, function: FuncId, location: StmtId) -> Self {
        self.function = Some(function);
        self.location = Some(location);
        self
    }

    /// Sets the function.
    pub fn function(mut self, function: FuncId) -> Self {
        self.function = Some(function);
        self
    }

    /// Sets the message. Defaults to the kind's description.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Sets the recording analysis.
    pub fn analysis(mut self, id: impl Into<String>) -> Self {
        self.analysis = Some(id.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.to_string());

        self.log.push(Event {
            kind: self.kind,
            function: self.function.take(),
            location: self.location.take(),
            message,
            analysis: self.analysis.take(),
        });
    }
}

/// Append-only, thread-safe event collection.
#[derive(Debug, Default)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        event.trace();
        self.events.push(event);
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Starts recording an event of `kind`.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an [`EventKind::Info`] message.
    pub fn info(&self, message: impl Into<String>) {
        self.push(Event::new(EventKind::Info, message));
    }

    /// Records an [`EventKind::Warning`] message.
    pub fn warn(&self, message: impl Into<String>) {
        self.push(Event::new(EventKind::Warning, message));
    }

    /// Records an [`EventKind::Error`] message.
    pub fn error(&self, message: impl Into<String>) {
        self.push(Event::new(EventKind::Error, message));
    }

    /// Returns `true` if an event of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind == kind)
    }

    /// Number of events of `kind`.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.iter().filter(|e| e.kind == kind).count()
    }

    /// All events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Events of `kind`.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Events concerning `function`.
    pub fn filter_function(&self, function: FuncId) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.function == Some(function))
    }

    /// Omission events (missing CFGs).
    pub fn omissions(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_omission())
    }

    /// Omissions plus info/warning/error messages.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_diagnostic())
    }

    /// Warning messages.
    pub fn warnings(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Warning)
    }

    /// Counts per kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for event in self.iter() {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// One-line summary such as `"1 call graph built, 2 cfg unavailable"`, in kind order.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let counts = self.count_by_kind();
        EventKind::iter()
            .filter_map(|kind| counts.get(&kind).map(|count| format!("{count} {kind}")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::StmtArena;

    #[test]
    fn test_builder_records_on_drop() {
        let log = EventLog::new();
        let stmt = StmtArena::new().insert(crate::ir::Stmt::Nop);
        log.record(EventKind::CallEdgesOmitted)
            .at(FuncId::new(0), stmt)
            .analysis("icfg")
            .message("callee add has no CFG");

        let event = log.iter().next().unwrap();
        assert_eq!(event.kind, EventKind::CallEdgesOmitted);
        assert_eq!(event.function, Some(FuncId::new(0)));
        assert_eq!(event.analysis.as_deref(), Some("icfg"));
        assert_eq!(event.to_string(), "[call edges omitted] f0@s0 callee add has no CFG");
    }

    #[test]
    fn test_default_message_is_kind() {
        let log = EventLog::new();
        log.record(EventKind::IcfgBuilt);
        assert_eq!(log.iter().next().unwrap().message, "icfg built");
    }

    #[test]
    fn test_queries_and_summary() {
        let log = EventLog::new();
        assert_eq!(log.summary(), "no events");

        log.record(EventKind::CfgUnavailable).function(FuncId::new(1));
        log.record(EventKind::CallGraphBuilt);
        log.warn("careful");

        assert_eq!(log.len(), 3);
        assert!(log.has(EventKind::Warning));
        assert_eq!(log.omissions().count(), 1);
        assert_eq!(log.diagnostics().count(), 2);
        assert_eq!(log.filter_function(FuncId::new(1)).count(), 1);
        assert_eq!(log.summary(), "1 call graph built, 1 cfg unavailable, 1 warning");
    }

    #[test]
    fn test_concurrent_recording() {
        use rayon::prelude::*;

        let log = EventLog::new();
        (0..64).into_par_iter().for_each(|i| {
            log.record(EventKind::CfgBuilt).function(FuncId::new(i));
        });
        assert_eq!(log.count_kind(EventKind::CfgBuilt), 64);
    }
}
