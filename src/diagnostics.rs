//! Sinks for non-fatal data errors.

#![forbid(unsafe_code)]

use std::cell::RefCell;

/// Receives recoverable error reports, e.g. failed message conversions.
pub trait Diagnostics {
    fn report(&self, text: &str);
}

/// Forwards reports to the `log` facade at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, text: &str) {
        log::warn!("{}", text);
    }
}

/// Keeps every report in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectedDiagnostics {
    reports: RefCell<Vec<String>>,
}

impl CollectedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the reports received so far.
    pub fn reports(&self) -> Vec<String> {
        self.reports.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }
}

impl Diagnostics for CollectedDiagnostics {
    fn report(&self, text: &str) {
        self.reports.borrow_mut().push(text.to_string());
    }
}
