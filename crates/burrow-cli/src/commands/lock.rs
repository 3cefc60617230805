//! `burrow lock` command implementation.
//!
//! Resolves the project's root dependencies against its sources and writes
//! `burrow.lock`. Nothing is written unless the whole walk succeeds.

use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use burrow_core::error::{BurrowError, BurrowResult};
use burrow_core::types::RootRequest;
use burrow_lockfile::{Lock, LOCK_FILE_NAME};
use burrow_resolver::{Resolver, ResolverConfig};

use super::{CommandContext, Project};
use crate::output::progress::MarkerPrinter;

/// Execute the `burrow lock` command
pub async fn execute(overwrite: bool, conservative: bool, ctx: &CommandContext) -> BurrowResult<()> {
    let start_time = Instant::now();
    let project = ctx.load_project().await?;
    let request = project.file.root_request()?;
    let current_hash = project.file.content_hash()?;
    let previous = Lock::load_if_exists(&project.lock_path())?;

    if let Some(existing) = &previous {
        let reason = stale_reason(existing, &request, &current_hash)
            .or_else(|| mode_mismatch(existing, conservative));
        match reason {
            None if !overwrite => {
                ctx.output.success(&format!("{LOCK_FILE_NAME} is up to date"));
                return Ok(());
            },
            None => info!("Lock is current, overwriting on request"),
            Some(reason) => info!("Lock is stale: {}", reason),
        }
    }

    let previous = if conservative {
        if previous.is_none() {
            ctx.output
                .warn(&format!("No {LOCK_FILE_NAME} to keep versions from, resolving from scratch"));
        }
        previous
    } else {
        None
    };

    let lock = lock_project(&project, &request, previous, ctx).await?;
    ctx.output.success(&format!(
        "Locked {} packages in {:.2}s",
        lock.packages().len(),
        start_time.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// Execute `burrow lock --fix-hashes`
pub async fn fix_hashes(ctx: &CommandContext) -> BurrowResult<()> {
    let project = ctx.load_project().await?;
    let lock_path = project.lock_path();
    let lock = Lock::load_if_exists(&lock_path)?.ok_or_else(|| BurrowError::StaleLock {
        reason: format!("no {LOCK_FILE_NAME} to repair"),
    })?;

    let pool = ctx.build_pool(&project.file.source_specs())?;
    ctx.output.step("Recomputing archive fingerprints");
    let repaired = lock.repair_hashes(pool.as_ref()).await?;

    let changed = lock
        .packages()
        .iter()
        .zip(repaired.packages())
        .filter(|(before, after)| before.fingerprint != after.fingerprint)
        .count();
    repaired.save(&lock_path)?;

    ctx.output
        .success(&format!("Updated {changed} fingerprint(s) in {LOCK_FILE_NAME}"));
    Ok(())
}

/// Resolve `request` and persist the lock next to the project file
pub async fn lock_project(
    project: &Project,
    request: &RootRequest,
    previous: Option<Lock>,
    ctx: &CommandContext,
) -> BurrowResult<Lock> {
    let pool = ctx.build_pool(&request.sources)?;
    let mut resolver = Resolver::new(pool)
        .with_reporter(Arc::new(MarkerPrinter::new()))
        .with_config(ResolverConfig {
            runtime_version: ctx.settings.runtime_version.clone(),
        });
    if let Some(previous) = previous {
        resolver = resolver.conservative(previous);
    }

    ctx.output.step("Resolving dependencies");
    let resolution = resolver.resolve(request).await?;

    let lock = resolution.to_lock().with_content_hash(project.file.content_hash()?);
    lock.save(&project.lock_path())?;
    info!("Wrote {}", project.lock_path());
    Ok(lock)
}

/// Why `lock` was produced in a different mode than the one requested
fn mode_mismatch(lock: &Lock, conservative: bool) -> Option<String> {
    if lock.metadata.conservative == conservative {
        return None;
    }
    let written = if lock.metadata.conservative {
        "conservatively"
    } else {
        "non-conservatively"
    };
    Some(format!("{LOCK_FILE_NAME} was written {written}"))
}

/// Why `lock` no longer matches the project, if it does not
pub fn stale_reason(lock: &Lock, request: &RootRequest, content_hash: &str) -> Option<String> {
    if let Some(reason) = lock.staleness(request) {
        return Some(reason);
    }
    match &lock.metadata.content_hash {
        Some(recorded) if recorded != content_hash => {
            Some(format!("{} changed since the lock was written", burrow_config::PROJECT_FILE_NAME))
        },
        _ => None,
    }
}
