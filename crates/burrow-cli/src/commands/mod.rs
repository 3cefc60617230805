//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking a [`CommandContext`], which
//! carries the working directory, the effective settings and the terminal
//! output handler.

use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use tracing::info;

use burrow_cache::{FetchCache, FetchCacheConfig, Fetcher, Store};
use burrow_config::{find_project_file, project, ProjectFile, Settings, SettingsLoader, SettingsOverrides};
use burrow_core::error::{BurrowError, BurrowResult};
use burrow_core::types::SourceSpec;
use burrow_lockfile::LOCK_FILE_NAME;
use burrow_registry::{ClientConfig, HttpFetcher, Pool, PoolConfig};

pub mod cache;
pub mod install;
pub mod lock;


use crate::output::OutputHandler;
use crate::{CacheCommand, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub settings: Settings,
    pub output: OutputHandler,
    /// Replaces the HTTP fetcher, for offline mirrors
    pub fetcher: Option<Arc<dyn Fetcher>>,
}

/// The loaded project file and where it lives
pub struct Project {
    pub file: ProjectFile,
    pub dir: Utf8PathBuf,
}

impl CommandContext {
    /// Create a new command context
    pub async fn new(overrides: SettingsOverrides) -> BurrowResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| BurrowError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| BurrowError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("current directory is not valid UTF-8: {e}"),
        })?;

        let settings = SettingsLoader::new()?.load(&overrides).await?;

        Ok(Self {
            cwd,
            settings,
            output: OutputHandler::new(),
            fetcher: None,
        })
    }

    /// Find and parse the nearest `burrow.toml`
    pub async fn load_project(&self) -> BurrowResult<Project> {
        let path = find_project_file(&self.cwd).ok_or_else(|| BurrowError::ConfigValidation {
            field: "project".to_string(),
            reason: format!(
                "no {} found in {} or any parent directory",
                burrow_config::PROJECT_FILE_NAME,
                self.cwd
            ),
        })?;
        let file = project::load_from_file(&path).await?;
        let dir = path
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone());
        Ok(Project { file, dir })
    }

    /// Open the durable download cache
    pub fn open_store(&self) -> BurrowResult<Store> {
        Ok(Store::open(&self.settings.cache_dir)?)
    }

    /// Build a source pool over the durable cache
    pub fn build_pool(&self, sources: &[SourceSpec]) -> BurrowResult<Arc<Pool>> {
        let fetcher: Arc<dyn Fetcher> = match &self.fetcher {
            Some(fetcher) => fetcher.clone(),
            None => {
                let config = ClientConfig {
                    timeout: self.settings.request_timeout,
                    ..ClientConfig::default()
                };
                Arc::new(HttpFetcher::new(config, sources)?)
            },
        };

        let cache = FetchCache::new(
            fetcher,
            self.open_store()?,
            FetchCacheConfig {
                max_concurrent_fetches: self.settings.max_concurrent_fetches,
            },
        );
        let config = PoolConfig {
            index_ttl: self.settings.index_ttl,
        };
        Ok(Arc::new(Pool::new(sources.to_vec(), Arc::new(cache), config)))
    }
}

impl Project {
    pub fn lock_path(&self) -> Utf8PathBuf {
        self.dir.join(LOCK_FILE_NAME)
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> BurrowResult<()> {
    match command {
        Commands::Lock {
            overwrite,
            conservative,
            fix_hashes,
        } => {
            info!(
                "Locking (overwrite: {}, conservative: {}, fix_hashes: {})",
                overwrite, conservative, fix_hashes
            );
            if fix_hashes {
                lock::fix_hashes(ctx).await
            } else {
                lock::execute(overwrite, conservative, ctx).await
            }
        },
        Commands::Install { frozen, categories } => {
            info!("Installing (frozen: {}, categories: {:?})", frozen, categories);
            install::execute(frozen, categories, ctx).await
        },
        Commands::Cache { action } => match action {
            CacheCommand::List => cache::list(ctx),
            CacheCommand::Remove { digest } => cache::remove(&digest, ctx),
            CacheCommand::Clear => cache::clear(ctx),
        },
    }
}
