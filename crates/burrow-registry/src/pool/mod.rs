//! Prioritized package pool.
//!
//! The pool merges every source's offers for a package name into tiers by
//! source priority. The highest tier that mentions a name is authoritative
//! for it: selection never falls through to a lower tier, even when the
//! authoritative tier has no acceptable version. Within a tier the newest
//! acceptable version wins, equal versions going to the source declared
//! first.

use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use burrow_cache::{extract_descriptor, CacheKey, CachePolicy, FetchCache, FetchError};
use burrow_core::descriptor::{Descriptor, DescriptorError};
use burrow_core::error::{BurrowError, BurrowResult};
use burrow_core::types::{Constraint, SourceSpec, Version};
use burrow_core::utils::fingerprint;
use burrow_lockfile::{ArtifactFingerprinter, LockedPackage, PackageOrigin};

use crate::source::Catalog;

/// Pool tuning
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum age of cached index pages
    pub index_ttl: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            index_ttl: Duration::from_secs(3600),
        }
    }
}

/// One version of a package offered by one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub version: Version,
    /// Name of the offering source
    pub source: String,
    /// Declaration index of the offering source
    pub source_index: usize,
    pub priority: i32,
    /// Archive path relative to the source root
    pub path: String,
}

/// Candidates from all sources sharing one priority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    pub priority: i32,
    /// Newest first, then by source declaration order
    pub candidates: Vec<Candidate>,
}

/// A chosen candidate together with its parsed descriptor
#[derive(Debug, Clone)]
pub struct Selection {
    pub candidate: Candidate,
    pub descriptor: Arc<Descriptor>,
}

/// Errors raised while querying the pool
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Package '{name}' not found in any source")]
    NotFound { name: String },

    #[error(
        "No version of '{name}' satisfies '{constraint}' in priority tier {priority} (sources: {})",
        .sources.join(", ")
    )]
    NoMatch {
        name: String,
        constraint: Constraint,
        priority: i32,
        sources: Vec<String>,
    },

    #[error("Malformed descriptor in {name} {version} from {origin}: {error}")]
    MalformedDescriptor {
        name: String,
        version: Version,
        origin: String,
        #[source]
        error: DescriptorError,
    },

    #[error("Unknown source '{name}'")]
    UnknownSource { name: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl From<PoolError> for BurrowError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::NotFound { name } => BurrowError::PackageNotFound { name },
            PoolError::NoMatch {
                name,
                constraint,
                priority,
                sources,
            } => BurrowError::NoMatch {
                package: name,
                constraint: constraint.to_string(),
                detail: format!(
                    "searched priority tier {} from {}",
                    priority,
                    sources.join(", ")
                ),
            },
            PoolError::MalformedDescriptor { name, error, .. } => BurrowError::MalformedDescriptor {
                package: name,
                source: error,
            },
            PoolError::UnknownSource { name } => BurrowError::ConfigValidation {
                field: "source".to_string(),
                reason: format!("unknown source '{name}'"),
            },
            PoolError::Fetch(e) => e.into(),
        }
    }
}

/// Prioritized view over every declared source
pub struct Pool {
    catalogs: Vec<Catalog>,
    cache: Arc<FetchCache>,
    tiers: DashMap<String, Arc<OnceCell<Arc<Vec<Tier>>>>>,
    descriptors: DashMap<CacheKey, Option<Arc<Descriptor>>>,
}

impl Candidate {
    /// Tarball file name
    pub fn filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.source)
    }
}

impl Pool {
    /// Create a pool over `sources`, in declaration order
    pub fn new(sources: Vec<SourceSpec>, cache: Arc<FetchCache>, config: PoolConfig) -> Self {
        let catalogs = sources
            .into_iter()
            .map(|spec| Catalog::new(spec, cache.clone(), config.index_ttl))
            .collect();
        Self {
            catalogs,
            cache,
            tiers: DashMap::new(),
            descriptors: DashMap::new(),
        }
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceSpec> {
        self.catalogs.iter().map(Catalog::spec)
    }

    pub fn cache(&self) -> &Arc<FetchCache> {
        &self.cache
    }

    /// Priority tiers for `name`, highest first. Built once per process.
    pub async fn tiers(&self, name: &str) -> Result<Arc<Vec<Tier>>, PoolError> {
        let cell = self.tiers.entry(name.to_string()).or_default().clone();
        let tiers = cell.get_or_try_init(|| self.build_tiers(name)).await?;
        Ok(tiers.clone())
    }

    async fn build_tiers(&self, name: &str) -> Result<Arc<Vec<Tier>>, PoolError> {
        let mut candidates = Vec::new();
        for (index, catalog) in self.catalogs.iter().enumerate() {
            for file in catalog.versions(name).await? {
                candidates.push(Candidate {
                    name: name.to_string(),
                    version: file.version,
                    source: catalog.spec().name.clone(),
                    source_index: index,
                    priority: catalog.spec().priority,
                    path: file.path,
                });
            }
        }

        candidates.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.version.cmp(&a.version))
                .then_with(|| a.source_index.cmp(&b.source_index))
        });

        let mut tiers: Vec<Tier> = Vec::new();
        for candidate in candidates {
            match tiers.last_mut() {
                Some(tier) if tier.priority == candidate.priority => tier.candidates.push(candidate),
                _ => tiers.push(Tier {
                    priority: candidate.priority,
                    candidates: vec![candidate],
                }),
            }
        }

        debug!("{} appears in {} tier(s)", name, tiers.len());
        Ok(Arc::new(tiers))
    }

    /// Every offered version of `name`: by tier, then newest first, then by
    /// source declaration order
    pub async fn package_versions(&self, name: &str) -> Result<Vec<Candidate>, PoolError> {
        let tiers = self.tiers(name).await?;
        Ok(tiers
            .iter()
            .flat_map(|tier| tier.candidates.iter().cloned())
            .collect())
    }

    /// Select the newest version of `name` satisfying `constraint` from its
    /// authoritative tier. Candidates whose archive carries no descriptor are
    /// treated as absent.
    pub async fn highest_version_satisfying(
        &self,
        name: &str,
        constraint: &Constraint,
    ) -> Result<Selection, PoolError> {
        let tiers = self.tiers(name).await?;
        let Some(tier) = tiers.first() else {
            return Err(PoolError::NotFound {
                name: name.to_string(),
            });
        };

        for candidate in tier.candidates.iter().filter(|c| constraint.allows(&c.version)) {
            match self.descriptor(candidate).await? {
                Some(descriptor) => {
                    debug!("selected {} for {} ({})", candidate, name, constraint);
                    return Ok(Selection {
                        candidate: candidate.clone(),
                        descriptor,
                    });
                },
                None => warn!("{} has no descriptor; treating it as absent", candidate),
            }
        }

        Err(PoolError::NoMatch {
            name: name.to_string(),
            constraint: constraint.clone(),
            priority: tier.priority,
            sources: self
                .sources()
                .filter(|spec| spec.priority == tier.priority)
                .map(|spec| spec.name.clone())
                .collect(),
        })
    }

    /// Find one exact offer, in any tier
    pub async fn find_exact(
        &self,
        name: &str,
        version: &Version,
        source: &str,
    ) -> Result<Option<Candidate>, PoolError> {
        let tiers = self.tiers(name).await?;
        Ok(tiers
            .iter()
            .flat_map(|tier| tier.candidates.iter())
            .find(|c| &c.version == version && c.source == source)
            .cloned())
    }

    /// Find one exact offer in the authoritative tier for `name`. An offer
    /// shadowed by a higher-priority source is not returned.
    pub async fn find_authoritative(
        &self,
        name: &str,
        version: &Version,
        source: &str,
    ) -> Result<Option<Candidate>, PoolError> {
        let tiers = self.tiers(name).await?;
        Ok(tiers
            .first()
            .and_then(|tier| {
                tier.candidates
                    .iter()
                    .find(|c| &c.version == version && c.source == source)
            })
            .cloned())
    }

    fn key(&self, candidate: &Candidate) -> Result<CacheKey, PoolError> {
        self.catalogs
            .get(candidate.source_index)
            .filter(|catalog| catalog.spec().name == candidate.source)
            .map(|catalog| catalog.key(&candidate.path))
            .ok_or_else(|| PoolError::UnknownSource {
                name: candidate.source.clone(),
            })
    }

    /// Full URL of a candidate's archive
    pub fn archive_url(&self, candidate: &Candidate) -> Result<String, PoolError> {
        Ok(self.key(candidate)?.url())
    }

    /// Parsed descriptor of a candidate, or `None` if its archive has none
    pub async fn descriptor(&self, candidate: &Candidate) -> Result<Option<Arc<Descriptor>>, PoolError> {
        let key = self.key(candidate)?;
        if let Some(known) = self.descriptors.get(&key) {
            return Ok(known.clone());
        }

        let archive = match self.cache.get(&key, CachePolicy::Durable).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                warn!("archive for {} is listed but missing", candidate);
                self.descriptors.insert(key, None);
                return Ok(None);
            },
            Err(e) => return Err(e.into()),
        };

        let parsed = match extract_descriptor(&archive)? {
            Some(text) => {
                let descriptor =
                    Descriptor::parse(&text).map_err(|error| PoolError::MalformedDescriptor {
                        name: candidate.name.clone(),
                        version: candidate.version.clone(),
                        origin: candidate.source.clone(),
                        error,
                    })?;
                Some(Arc::new(descriptor))
            },
            None => None,
        };
        self.descriptors.insert(key, parsed.clone());
        Ok(parsed)
    }

    /// Archive bytes of a candidate
    pub async fn fetch_archive(&self, candidate: &Candidate) -> Result<Arc<[u8]>, PoolError> {
        let key = self.key(candidate)?;
        Ok(self.cache.get(&key, CachePolicy::Durable).await?)
    }

    /// Drop the cached archive of a candidate and download it again
    pub async fn refetch_archive(&self, candidate: &Candidate) -> Result<Arc<[u8]>, PoolError> {
        let key = self.key(candidate)?;
        self.refetch(&key).await
    }

    async fn refetch(&self, key: &CacheKey) -> Result<Arc<[u8]>, PoolError> {
        debug!("refetching {}", key);
        self.cache.invalidate(key)?;
        self.descriptors.remove(key);
        Ok(self.cache.get(key, CachePolicy::Durable).await?)
    }

    /// `sha256:` fingerprint of a candidate's archive
    pub async fn fingerprint(&self, candidate: &Candidate) -> Result<String, PoolError> {
        let archive = self.fetch_archive(candidate).await?;
        Ok(fingerprint(&archive))
    }
}

#[async_trait]
impl ArtifactFingerprinter for Pool {
    async fn fingerprint(&self, package: &LockedPackage) -> BurrowResult<String> {
        let PackageOrigin::Source { source, path } = &package.origin else {
            return Err(BurrowError::Lock {
                message: format!("'{}' is not a source package", package.name),
                source: None,
            });
        };
        let catalog = self
            .catalogs
            .iter()
            .find(|catalog| &catalog.spec().name == source)
            .ok_or_else(|| PoolError::UnknownSource {
                name: source.clone(),
            })?;
        // Repair reflects what the source serves now, not the cached copy
        let archive = self.refetch(&catalog.key(path)).await?;
        Ok(fingerprint(&archive))
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("catalogs", &self.catalogs)
            .field("names", &self.tiers.len())
            .finish()
    }
}
