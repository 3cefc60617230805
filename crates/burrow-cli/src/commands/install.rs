//! `burrow install` command implementation.
//!
//! Reads (or refreshes) `burrow.lock`, fetches every locked archive in
//! dependency order and prints the resulting install plan. Building the
//! packages is left to the runtime's own tooling.

use std::collections::BTreeSet;
use std::time::Instant;
use tracing::warn;

use burrow_core::error::{BurrowError, BurrowResult};
use burrow_core::types::Category;
use burrow_core::utils::verify_fingerprint;
use burrow_lockfile::{Lock, LockedPackage, PackageOrigin, LOCK_FILE_NAME};
use burrow_registry::Pool;

use super::lock::{lock_project, stale_reason};
use super::CommandContext;

/// One line of the install plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub name: String,
    pub version: String,
    /// Archive URL or `git+<url>@<commit>`
    pub location: String,
}

/// Execute the `burrow install` command
pub async fn execute(frozen: bool, categories: Vec<Category>, ctx: &CommandContext) -> BurrowResult<()> {
    let start_time = Instant::now();
    let project = ctx.load_project().await?;
    let request = project.file.root_request()?;
    let current_hash = project.file.content_hash()?;

    let existing = Lock::load_if_exists(&project.lock_path())?;
    let stale = existing
        .as_ref()
        .and_then(|lock| stale_reason(lock, &request, &current_hash));

    let lock = match (existing, stale) {
        (Some(lock), None) => lock,
        (_, reason) => {
            let reason = reason.unwrap_or_else(|| format!("no {LOCK_FILE_NAME} found"));
            if frozen {
                return Err(BurrowError::StaleLock { reason });
            }
            ctx.output.warn(&format!("{reason}, re-locking"));
            lock_project(&project, &request, None, ctx).await?
        },
    };

    let categories: BTreeSet<Category> = if categories.is_empty() {
        Category::ALL.into_iter().collect()
    } else {
        categories.into_iter().collect()
    };

    let pool = ctx.build_pool(&project.file.source_specs())?;
    let plan = build_plan(&lock, &categories, &pool).await?;

    ctx.output.step("Install plan");
    for (index, step) in plan.iter().enumerate() {
        ctx.output.plain(&format!(
            "  [{}/{}] {} {}  {}",
            index + 1,
            plan.len(),
            step.name,
            step.version,
            step.location
        ));
    }

    ctx.output.success(&format!(
        "Fetched {} packages in {:.2}s",
        plan.len(),
        start_time.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// Fetch and verify every archive the categories need, in install order.
///
/// Packages bundled with the runtime are skipped.
pub async fn build_plan(
    lock: &Lock,
    categories: &BTreeSet<Category>,
    pool: &Pool,
) -> BurrowResult<Vec<PlanStep>> {
    let mut plan = Vec::new();
    for package in lock.install_order_for(categories)? {
        if let Some(step) = plan_step(package, pool).await? {
            plan.push(step);
        }
    }
    Ok(plan)
}

async fn plan_step(package: &LockedPackage, pool: &Pool) -> BurrowResult<Option<PlanStep>> {
    let version = package
        .version
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();

    let location = match &package.origin {
        PackageOrigin::Core => return Ok(None),
        PackageOrigin::Vcs { url, commit, .. } => format!("git+{url}@{commit}"),
        PackageOrigin::Source { source, .. } => {
            let Some(pinned) = &package.version else {
                return Err(BurrowError::StaleLock {
                    reason: format!("'{}' is locked without a version", package.name),
                });
            };
            let candidate = pool
                .find_exact(&package.name, pinned, source)
                .await?
                .ok_or_else(|| BurrowError::StaleLock {
                    reason: format!("{} {} is no longer offered by {}", package.name, pinned, source),
                })?;

            let archive = pool.fetch_archive(&candidate).await?;
            if let Some(expected) = &package.fingerprint {
                // A cached copy that no longer matches gets one fresh download
                if verify_fingerprint(&package.name, &archive, expected).is_err() {
                    warn!("Cached archive of {} does not match the lock, downloading again", candidate);
                    let archive = pool.refetch_archive(&candidate).await?;
                    verify_fingerprint(&package.name, &archive, expected)?;
                }
            }
            pool.archive_url(&candidate)?
        },
    };

    Ok(Some(PlanStep {
        name: package.name.clone(),
        version,
        location,
    }))
}
