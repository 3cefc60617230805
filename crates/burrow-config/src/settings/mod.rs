//! User settings, layered from defaults, the global file, the environment
//! and the command line.
//!
//! Later layers win field by field:
//!
//! 1. built-in defaults
//! 2. `~/.burrow/config.toml`
//! 3. `BURROW_*` environment variables
//! 4. command-line flags

use camino::Utf8PathBuf;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

use burrow_core::error::BurrowError;
use burrow_core::types::Version;

use crate::ConfigResult;

const GLOBAL_DIR: &str = ".burrow";
const GLOBAL_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "BURROW_";

static DEFAULT_ORIGIN: SettingsSource = SettingsSource::Default;

/// Effective settings for one command
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Root of the durable fetch cache
    pub cache_dir: Utf8PathBuf,
    /// Upper bound on concurrent network fetches
    pub max_concurrent_fetches: usize,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Maximum age of cached index pages
    pub index_ttl: Duration,
    /// Runtime version constraints on `R` are validated against
    pub runtime_version: Option<Version>,
    origins: BTreeMap<&'static str, SettingsSource>,
}

/// Where a setting's effective value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    Default,
    /// Global config file
    Global(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

/// Command-line overrides, the highest-priority layer
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub cache_dir: Option<Utf8PathBuf>,
    pub max_concurrent_fetches: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub index_ttl_secs: Option<u64>,
    pub runtime_version: Option<String>,
}

/// Raw global settings file; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct SettingsFile {
    cache_dir: Option<Utf8PathBuf>,
    max_concurrent_fetches: Option<usize>,
    request_timeout: Option<u64>,
    index_ttl: Option<u64>,
    runtime_version: Option<String>,
}

/// Main settings loading interface
pub struct SettingsLoader {
    home: Option<Utf8PathBuf>,
    env: HashMap<String, String>,
}

impl Settings {
    /// Built-in defaults rooted at `home`
    pub fn defaults(home: Option<&Utf8PathBuf>) -> Self {
        let base = home
            .map(|home| home.join(GLOBAL_DIR))
            .unwrap_or_else(|| Utf8PathBuf::from(GLOBAL_DIR));
        Self {
            cache_dir: base.join("cache"),
            max_concurrent_fetches: 8,
            request_timeout: Duration::from_secs(30),
            index_ttl: Duration::from_secs(3600),
            runtime_version: None,
            origins: BTreeMap::new(),
        }
    }

    /// Layer that set a field, [`SettingsSource::Default`] if none did
    pub fn source_of(&self, field: &str) -> &SettingsSource {
        self.origins.get(field).unwrap_or(&DEFAULT_ORIGIN)
    }

    fn set_cache_dir(&mut self, value: Utf8PathBuf, origin: SettingsSource) {
        self.cache_dir = value;
        self.origins.insert("cache_dir", origin);
    }

    fn set_max_concurrent_fetches(
        &mut self,
        value: usize,
        field: &str,
        origin: SettingsSource,
    ) -> ConfigResult<()> {
        if value == 0 {
            return Err(invalid(field, "must be at least 1".to_string()));
        }
        self.max_concurrent_fetches = value;
        self.origins.insert("max_concurrent_fetches", origin);
        Ok(())
    }

    fn set_request_timeout(&mut self, secs: u64, field: &str, origin: SettingsSource) -> ConfigResult<()> {
        if secs == 0 {
            return Err(invalid(field, "must be at least one second".to_string()));
        }
        self.request_timeout = Duration::from_secs(secs);
        self.origins.insert("request_timeout", origin);
        Ok(())
    }

    fn set_index_ttl(&mut self, secs: u64, origin: SettingsSource) {
        self.index_ttl = Duration::from_secs(secs);
        self.origins.insert("index_ttl", origin);
    }

    fn set_runtime_version(&mut self, text: &str, field: &str, origin: SettingsSource) -> ConfigResult<()> {
        let version = Version::parse(text).map_err(|e| invalid(field, e.to_string()))?;
        self.runtime_version = Some(version);
        self.origins.insert("runtime_version", origin);
        Ok(())
    }

    fn apply_file(&mut self, file: SettingsFile, path: &Utf8PathBuf) -> ConfigResult<()> {
        let origin = || SettingsSource::Global(path.clone());
        if let Some(dir) = file.cache_dir {
            self.set_cache_dir(dir, origin());
        }
        if let Some(value) = file.max_concurrent_fetches {
            self.set_max_concurrent_fetches(value, "max-concurrent-fetches", origin())?;
        }
        if let Some(secs) = file.request_timeout {
            self.set_request_timeout(secs, "request-timeout", origin())?;
        }
        if let Some(secs) = file.index_ttl {
            self.set_index_ttl(secs, origin());
        }
        if let Some(text) = file.runtime_version {
            self.set_runtime_version(&text, "runtime-version", origin())?;
        }
        Ok(())
    }

    fn apply_env(&mut self, env: &HashMap<String, String>) -> ConfigResult<()> {
        // Sorted so the first invalid variable reported is stable
        let mut keys: Vec<&String> = env.keys().collect();
        keys.sort();

        for key in keys {
            let value = env[key].as_str();
            let origin = SettingsSource::Environment(key.clone());
            match key.as_str() {
                "BURROW_CACHE_DIR" => self.set_cache_dir(Utf8PathBuf::from(value), origin),
                "BURROW_MAX_CONCURRENT_FETCHES" => {
                    let parsed = parse_number(key, value)?;
                    self.set_max_concurrent_fetches(parsed as usize, key, origin)?;
                },
                "BURROW_REQUEST_TIMEOUT" => {
                    let secs = parse_number(key, value)?;
                    self.set_request_timeout(secs, key, origin)?;
                },
                "BURROW_INDEX_TTL" => {
                    let secs = parse_number(key, value)?;
                    self.set_index_ttl(secs, origin);
                },
                "BURROW_RUNTIME_VERSION" => self.set_runtime_version(value, key, origin)?,
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &SettingsOverrides) -> ConfigResult<()> {
        if let Some(dir) = &overrides.cache_dir {
            self.set_cache_dir(dir.clone(), SettingsSource::CommandLine);
        }
        if let Some(value) = overrides.max_concurrent_fetches {
            self.set_max_concurrent_fetches(value, "--jobs", SettingsSource::CommandLine)?;
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.set_request_timeout(secs, "--timeout", SettingsSource::CommandLine)?;
        }
        if let Some(secs) = overrides.index_ttl_secs {
            self.set_index_ttl(secs, SettingsSource::CommandLine);
        }
        if let Some(text) = &overrides.runtime_version {
            self.set_runtime_version(text, "--runtime-version", SettingsSource::CommandLine)?;
        }
        Ok(())
    }
}

impl SettingsLoader {
    /// Loader reading the real home directory and process environment
    pub fn new() -> ConfigResult<Self> {
        let home = match dirs::home_dir() {
            Some(dir) => Some(Utf8PathBuf::try_from(dir).map_err(|e| {
                invalid("home_dir", format!("Invalid home directory path: {e}"))
            })?),
            None => None,
        };
        Ok(Self {
            home,
            env: collect_env_overrides(),
        })
    }

    pub fn with_home(mut self, home: Utf8PathBuf) -> Self {
        self.home = Some(home);
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Location of the global settings file, if a home directory is known
    pub fn global_config_path(&self) -> Option<Utf8PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(GLOBAL_DIR).join(GLOBAL_FILE))
    }

    /// Merge every layer into effective settings
    pub async fn load(&self, overrides: &SettingsOverrides) -> ConfigResult<Settings> {
        let mut settings = Settings::defaults(self.home.as_ref());

        if let Some(path) = self.global_config_path() {
            if let Some(file) = load_global_file(&path).await? {
                debug!("Applying global settings from {}", path);
                settings.apply_file(file, &path)?;
            }
        }

        settings.apply_env(&self.env)?;
        settings.apply_overrides(overrides)?;

        debug!(
            "Settings: cache_dir={} jobs={} timeout={:?} index_ttl={:?}",
            settings.cache_dir,
            settings.max_concurrent_fetches,
            settings.request_timeout,
            settings.index_ttl
        );
        Ok(settings)
    }
}

/// Collect `BURROW_*` environment variables
pub fn collect_env_overrides() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect()
}

async fn load_global_file(path: &Utf8PathBuf) -> ConfigResult<Option<SettingsFile>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(BurrowError::io(format!("Failed to read {path}"), e)),
    };
    toml::from_str(&content)
        .map(Some)
        .map_err(|e| invalid(path.as_str(), e.to_string()))
}

fn parse_number(key: &str, value: &str) -> ConfigResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, format!("expected a whole number, found '{value}'")))
}

fn invalid(field: &str, reason: String) -> BurrowError {
    BurrowError::ConfigValidation {
        field: field.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn home() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    fn write_global(home: &Utf8PathBuf, content: &str) {
        let dir = home.join(GLOBAL_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(GLOBAL_FILE), content).unwrap();
    }

    fn loader(home: &Utf8PathBuf, env: &[(&str, &str)]) -> SettingsLoader {
        SettingsLoader {
            home: None,
            env: HashMap::new(),
        }
        .with_home(home.clone())
        .with_env(
            env.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_defaults() {
        let (_dir, home) = home();
        let settings = loader(&home, &[]).load(&SettingsOverrides::default()).await.unwrap();

        assert_eq!(settings.cache_dir, home.join(".burrow").join("cache"));
        assert_eq!(settings.max_concurrent_fetches, 8);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.index_ttl, Duration::from_secs(3600));
        assert_eq!(settings.runtime_version, None);
        assert_eq!(settings.source_of("cache_dir"), &SettingsSource::Default);
    }

    #[tokio::test]
    async fn test_global_file_layer() {
        let (_dir, home) = home();
        write_global(
            &home,
            "cache-dir = \"/var/cache/burrow\"\nmax-concurrent-fetches = 4\nruntime-version = \"4.3.1\"\n",
        );

        let settings = loader(&home, &[]).load(&SettingsOverrides::default()).await.unwrap();
        assert_eq!(settings.cache_dir, Utf8PathBuf::from("/var/cache/burrow"));
        assert_eq!(settings.max_concurrent_fetches, 4);
        assert_eq!(settings.runtime_version, Some(Version::parse("4.3.1").unwrap()));
        assert!(matches!(settings.source_of("cache_dir"), SettingsSource::Global(_)));
        assert_eq!(settings.source_of("index_ttl"), &SettingsSource::Default);
    }

    #[tokio::test]
    async fn test_layer_precedence() {
        let (_dir, home) = home();
        write_global(&home, "max-concurrent-fetches = 4\nrequest-timeout = 10\nindex-ttl = 60\n");

        let env = [
            ("BURROW_MAX_CONCURRENT_FETCHES", "2"),
            ("BURROW_REQUEST_TIMEOUT", "20"),
            ("BURROW_UNRELATED", "ignored"),
        ];
        let overrides = SettingsOverrides {
            request_timeout_secs: Some(5),
            ..SettingsOverrides::default()
        };

        let settings = loader(&home, &env).load(&overrides).await.unwrap();

        // Global file beats defaults
        assert_eq!(settings.index_ttl, Duration::from_secs(60));
        // Environment beats the global file
        assert_eq!(settings.max_concurrent_fetches, 2);
        assert_eq!(
            settings.source_of("max_concurrent_fetches"),
            &SettingsSource::Environment("BURROW_MAX_CONCURRENT_FETCHES".to_string())
        );
        // Command line beats everything
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.source_of("request_timeout"), &SettingsSource::CommandLine);
    }

    #[tokio::test]
    async fn test_invalid_values() {
        let (_dir, home) = home();

        let err = loader(&home, &[("BURROW_MAX_CONCURRENT_FETCHES", "many")])
            .load(&SettingsOverrides::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BurrowError::ConfigValidation { ref field, .. } if field == "BURROW_MAX_CONCURRENT_FETCHES"
        ));

        let overrides = SettingsOverrides {
            max_concurrent_fetches: Some(0),
            ..SettingsOverrides::default()
        };
        assert!(loader(&home, &[]).load(&overrides).await.is_err());

        let overrides = SettingsOverrides {
            runtime_version: Some("four".to_string()),
            ..SettingsOverrides::default()
        };
        assert!(loader(&home, &[]).load(&overrides).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_global_key_rejected() {
        let (_dir, home) = home();
        write_global(&home, "cache = \"/tmp\"\n");

        let err = loader(&home, &[]).load(&SettingsOverrides::default()).await.unwrap_err();
        assert!(matches!(err, BurrowError::ConfigValidation { .. }));
    }

    #[test]
    fn test_collect_env_overrides() {
        std::env::set_var("BURROW_TEST_COLLECT", "1");
        std::env::set_var("NOT_BURROW_TEST_COLLECT", "1");

        let overrides = collect_env_overrides();
        assert!(overrides.contains_key("BURROW_TEST_COLLECT"));
        assert!(!overrides.contains_key("NOT_BURROW_TEST_COLLECT"));

        std::env::remove_var("BURROW_TEST_COLLECT");
        std::env::remove_var("NOT_BURROW_TEST_COLLECT");
    }
}
