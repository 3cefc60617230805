use burrow_core::types::RUNTIME_PACKAGE;

/// Packages bundled with the runtime; never looked up in a source
pub const CORE_PACKAGES: &[&str] = &[
    RUNTIME_PACKAGE,
    "base",
    "compiler",
    "datasets",
    "grDevices",
    "graphics",
    "grid",
    "methods",
    "parallel",
    "splines",
    "stats",
    "stats4",
    "tcltk",
    "tools",
    "translations",
    "utils",
];

pub fn is_core_package(name: &str) -> bool {
    CORE_PACKAGES.contains(&name)
}
