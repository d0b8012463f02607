//! Errors and warnings collected while converting or validating a file.
//!
//! Findings are data, not output: library code records them here and the
//! command layer decides how (and whether) to print them.

/// Ordered findings from a single conversion or validation step.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem that leaves the output invalid.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Record a problem that was worked around or can be fixed.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Append all findings of `other`, prefixing each message with `scope`.
    pub fn extend_scoped(&mut self, scope: &str, other: Self) {
        self.errors
            .extend(other.errors.into_iter().map(|e| format!("{scope}: {e}")));
        self.warnings
            .extend(other.warnings.into_iter().map(|w| format!("{scope}: {w}")));
    }

    /// Append all findings of `other` unchanged.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}
