//! Configuration parsing for Burrow
//!
//! This crate reads the project's `burrow.toml` (declared sources and root
//! dependencies) and the user's layered settings (global file, `BURROW_*`
//! environment variables and command-line overrides).

pub mod project;
pub mod settings;

// Re-export main types
pub use project::{
    find_project_file, DependencySpec, ProjectFile, ProjectSection, SourceEntry, DEFAULT_SOURCE_NAME,
    DEFAULT_SOURCE_URL, PROJECT_FILE_NAME,
};
pub use settings::{Settings, SettingsLoader, SettingsOverrides, SettingsSource};

use burrow_core::error::BurrowError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, BurrowError>;
