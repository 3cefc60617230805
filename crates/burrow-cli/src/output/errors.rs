//! Error message formatting with actionable suggestions.
//!
//! A report is the error itself, a `help:` line when the error knows how to
//! fix it, and the chain of underlying causes.

use burrow_core::error::BurrowError;
use std::error::Error;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with context and suggestions
    pub fn format_error(&self, error: &BurrowError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            source = err.source();
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> ErrorFormatter {
        ErrorFormatter::with_colors(ColorSupport::disabled())
    }

    #[test]
    fn test_format_with_suggestion() {
        let err = BurrowError::CircularDependency {
            cycle: "a -> b -> a".to_string(),
        };
        let text = plain().format_error(&err);
        assert!(text.starts_with("error: Circular dependency detected: a -> b -> a\n"));
        assert!(text.contains("help: "));
    }

    #[test]
    fn test_format_cause_chain() {
        let err = BurrowError::io(
            "Failed to read burrow.lock".to_string(),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
        );
        let text = plain().format_error(&err);
        assert!(text.contains("error: IO error: Failed to read burrow.lock"));
        assert!(text.ends_with("caused by: permission denied"));
    }
}
