//! `holo cache`: persistent build cache maintenance.

use holo_cache::BuildCache;

use crate::project::cache_options;
use crate::{CacheCommand, GlobalArgs, ReportFormat};

/// Runs a `holo cache` subcommand. Always returns exit code 0 on success.
pub fn run(command: &CacheCommand, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let options = cache_options(global)?;
    let cache_dir = options.cache_dir.clone();
    let mut cache = BuildCache::open(options)?;

    match command {
        CacheCommand::Stats { format } => {
            let stats = cache.stats();
            match format {
                ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                ReportFormat::Text => {
                    println!("cache:   {}", cache_dir.display());
                    println!("entries: {}", stats.entries);
                    println!("size:    {} bytes", stats.total_size);
                    for (kind, count) in &stats.by_kind {
                        println!("  {kind:<10} {count}");
                    }
                }
            }
        }
        CacheCommand::Prune => {
            let removed = cache.prune()?;
            report(global, &format!("pruned {removed} entries"));
        }
        CacheCommand::Clear => {
            cache.clear()?;
            report(global, "cache cleared");
        }
        CacheCommand::Invalidate {
            source,
            kind,
            dependents,
        } => {
            let kinds = (!kind.is_empty()).then_some(kind.as_slice());
            let mut removed = cache.invalidate(source, kinds)?;
            if *dependents {
                removed += cache.invalidate_dependents(source)?;
            }
            report(global, &format!("invalidated {removed} entries"));
        }
        CacheCommand::InvalidateTag { tag } => {
            let removed = cache.invalidate_by_tag(tag)?;
            report(global, &format!("invalidated {removed} entries tagged '{tag}'"));
        }
    }
    Ok(0)
}

fn report(global: &GlobalArgs, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
