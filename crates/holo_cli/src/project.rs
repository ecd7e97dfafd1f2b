//! Project root discovery and configuration loading shared by commands.

use std::path::{Path, PathBuf};

use holo_cache::CacheOptions;
use holo_config::{CacheConfig, CONFIG_FILE};
use tracing::debug;

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `holo.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `holo.toml`.
pub fn resolve_project_root(
    global: &GlobalArgs,
) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(Some(
                p.parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(".")),
            ))
        } else {
            Ok(Some(p))
        }
    } else {
        Ok(find_project_root(&std::env::current_dir()?))
    }
}

/// Cache options for the current project.
///
/// Outside a project the defaults apply, rooted at the current directory.
pub fn cache_options(global: &GlobalArgs) -> Result<CacheOptions, Box<dyn std::error::Error>> {
    match resolve_project_root(global)? {
        Some(root) => {
            let config = holo_config::load_config(&root)?;
            debug!(project = %config.project.name, root = %root.display(), "loaded project config");
            Ok(config.cache.to_options(&root))
        }
        None => {
            let cwd = std::env::current_dir()?;
            debug!(dir = %cwd.display(), "no holo.toml found, using default cache settings");
            Ok(CacheConfig::default().to_options(&cwd))
        }
    }
}
