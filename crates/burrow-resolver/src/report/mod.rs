//! Resolution progress markers.
//!
//! Every binding is announced once as a fresh marker carrying its version
//! label; later requests for the same name produce a reused marker with the
//! label `...`. Markers are indented by walk depth.

use std::sync::Mutex;

/// One progress event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker<'a> {
    /// A name was bound for the first time
    Fresh { name: &'a str, label: &'a str },
    /// A bound name was requested again and still fits
    Reused { name: &'a str },
}

/// Receives progress markers from the resolver
pub trait Reporter: Send + Sync {
    fn marker(&self, depth: usize, marker: &Marker<'_>);
}

/// Render a marker as `- name (label)`, indented by `2 + 2 * depth`
pub fn render_marker(depth: usize, marker: &Marker<'_>) -> String {
    let (name, label) = match marker {
        Marker::Fresh { name, label } => (*name, *label),
        Marker::Reused { name } => (*name, "..."),
    };
    format!("{:indent$}- {} ({})", "", name, label, indent = 2 + 2 * depth)
}

/// Discards every marker
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn marker(&self, _depth: usize, _marker: &Marker<'_>) {}
}

/// Keeps rendered markers in memory
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}

impl Reporter for RecordingReporter {
    fn marker(&self, depth: usize, marker: &Marker<'_>) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(render_marker(depth, marker));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_indentation() {
        let fresh = Marker::Fresh {
            name: "dplyr",
            label: "1.1.4",
        };
        assert_eq!(render_marker(0, &fresh), "  - dplyr (1.1.4)");
        assert_eq!(render_marker(2, &fresh), "      - dplyr (1.1.4)");
        assert_eq!(render_marker(1, &Marker::Reused { name: "rlang" }), "    - rlang (...)");
    }

    #[test]
    fn test_recording_reporter() {
        let reporter = RecordingReporter::new();
        reporter.marker(0, &Marker::Fresh { name: "a", label: "1.0" });
        reporter.marker(1, &Marker::Reused { name: "b" });
        assert_eq!(reporter.lines(), vec!["  - a (1.0)", "    - b (...)"]);
    }
}
