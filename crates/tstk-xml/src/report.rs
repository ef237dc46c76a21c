//! Error sinks
//!
//! Assembly never returns error values across the tree; every problem is sent
//! to a [`Report`] with the input line it refers to and parsing goes on.

use crate::ParseError;

/// Destination of parse errors
pub trait Report {
    /// Record one error. Line 0 means the error is not tied to an input line.
    fn report(&mut self, line: usize, error: ParseError);
}

impl<R: Report + ?Sized> Report for &mut R {
    fn report(&mut self, line: usize, error: ParseError) {
        (**self).report(line, error);
    }
}

/// Sink forwarding errors to `tracing`
#[derive(Debug, Default, Clone)]
pub struct LogReport {
    source: Option<String>,
    errors: usize,
}

impl LogReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every message with an input name, usually a file path
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            errors: 0,
        }
    }

    /// Number of errors logged so far
    pub fn error_count(&self) -> usize {
        self.errors
    }
}

impl Report for LogReport {
    fn report(&mut self, line: usize, error: ParseError) {
        self.errors += 1;
        match &self.source {
            Some(source) => tracing::warn!("{}:{}: {}", source, line, error),
            None => tracing::warn!("line {}: {}", line, error),
        }
    }
}

/// Sink keeping every error in memory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorList {
    errors: Vec<(usize, ParseError)>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded errors with their lines, in report order
    pub fn errors(&self) -> &[(usize, ParseError)] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Take all errors (clears list)
    pub fn take(&mut self) -> Vec<(usize, ParseError)> {
        std::mem::take(&mut self.errors)
    }
}

impl Report for ErrorList {
    fn report(&mut self, line: usize, error: ParseError) {
        self.errors.push((line, error));
    }
}

/// Sink discarding everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReport;

impl Report for NullReport {
    fn report(&mut self, _line: usize, _error: ParseError) {}
}
