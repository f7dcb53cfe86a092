//! Types for standardized reports to the user about normalization and
//! statistics operations.
//!
//! Some operations silently reduce or qualify their input: rows are dropped
//! by the density threshold, events are present in only one of signal and
//! control, and z-scores are undefined where the background does not vary.
//! None of these are errors, but the user should hear about them, so
//! commands collect them in a [`Report`].
//!

/// The [`CommandOutput<U>`] type output is generic over some data output
/// from a command, and a [`Report`] that reports information to the user.
pub struct CommandOutput<U> {
    value: U,
    report: Report,
}

impl<U> CommandOutput<U> {
    pub fn new(value: U, report: Report) -> Self {
        Self { value, report }
    }

    pub fn value(&self) -> &U {
        &self.value
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_parts(self) -> (U, Report) {
        (self.value, self.report)
    }
}

/// A type to (semi) standardize reporting to the user.
#[derive(Debug, Default)]
pub struct Report {
    entries: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, message: String) {
        self.entries.push(message)
    }

    pub fn issues(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
