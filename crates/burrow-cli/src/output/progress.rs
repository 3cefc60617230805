//! Live resolver progress.

use burrow_resolver::{render_marker, Marker, Reporter};

use super::colors::ColorSupport;

/// Prints each resolver marker as it happens; reused markers are dimmed
pub struct MarkerPrinter {
    colors: ColorSupport,
}

impl MarkerPrinter {
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }
}

impl Default for MarkerPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for MarkerPrinter {
    fn marker(&self, depth: usize, marker: &Marker<'_>) {
        let line = render_marker(depth, marker);
        match marker {
            Marker::Fresh { .. } => println!("{line}"),
            Marker::Reused { .. } => println!("{}", self.colors.dim(&line)),
        }
    }
}
