//! `burrow cache` subcommands.

use burrow_core::error::{BurrowError, BurrowResult};

use super::CommandContext;

/// List cached entries, largest first
pub fn list(ctx: &CommandContext) -> BurrowResult<()> {
    let store = ctx.open_store()?;
    let mut entries = store.entries();
    if entries.is_empty() {
        ctx.output.info(&format!("Cache at {} is empty", store.root_path()));
        return Ok(());
    }

    entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.digest.cmp(&b.digest)));
    let total: u64 = entries.iter().map(|entry| entry.size).sum();

    for entry in &entries {
        ctx.output.plain(&format!(
            "{}  {:>10}  {}/{}",
            entry.digest,
            format_size(entry.size),
            entry.source.trim_end_matches('/'),
            entry.path
        ));
    }
    ctx.output.info(&format!(
        "{} entries, {} in {}",
        entries.len(),
        format_size(total),
        store.root_path()
    ));
    Ok(())
}

/// Remove one entry by digest
pub fn remove(digest: &str, ctx: &CommandContext) -> BurrowResult<()> {
    let store = ctx.open_store()?;
    match store.remove(digest)? {
        Some(size) => {
            ctx.output
                .success(&format!("Removed {digest} ({})", format_size(size)));
            Ok(())
        },
        None => Err(BurrowError::ConfigValidation {
            field: "digest".to_string(),
            reason: format!("no cache entry with digest '{digest}'"),
        }),
    }
}

/// Remove every entry
pub fn clear(ctx: &CommandContext) -> BurrowResult<()> {
    let store = ctx.open_store()?;
    let freed = store.clear()?;
    ctx.output
        .success(&format!("Cleared cache, freed {}", format_size(freed)));
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
