//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the configuration file in a project directory.
pub const CONFIG_FILE: &str = "holo.toml";

/// Loads and validates a `holo.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;
    parse_config(&content, &config_path.display().to_string())
}

/// Parses and validates a `holo.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    parse_config(content, CONFIG_FILE)
}

fn parse_config(content: &str, file: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
        file: file.to_string(),
        reason: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are usable.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField {
            field: "project.name",
        });
    }
    if config.cache.max_size == 0 {
        return Err(ConfigError::InvalidValue {
            field: "cache.max_size",
            reason: "must be greater than zero",
        });
    }
    if config.cache.ttl_secs == 0 {
        return Err(ConfigError::InvalidValue {
            field: "cache.ttl_secs",
            reason: "must be greater than zero",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "lobby"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "lobby");
        assert!(config.project.version.is_none());
        assert_eq!(config.cache.dir, ".holo-cache");
        assert!(config.cache.compress);
        assert!(config.incremental.skip_unchanged);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "arena"
version = "0.3.0"

[cache]
dir = "build/cache"
max_size = "64MiB"
ttl_secs = 3600
compression_threshold = 2048
compress = false

[incremental]
skip_unchanged = false
preserve_state = true
force_recompile = ["scoreboard"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.version.as_deref(), Some("0.3.0"));
        assert_eq!(config.cache.dir, "build/cache");
        assert_eq!(config.cache.max_size, 64 * 1024 * 1024);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.cache.compression_threshold, 2048);
        assert!(!config.cache.compress);

        let opts = config.incremental.to_options();
        assert!(!opts.skip_unchanged);
        assert!(opts.preserve_state);
        assert_eq!(opts.force_recompile, vec!["scoreboard"]);
    }

    #[test]
    fn integer_max_size() {
        let toml = r#"
[project]
name = "arena"

[cache]
max_size = 1048576
"#;
        assert_eq!(load_config_from_str(toml).unwrap().cache.max_size, 1_048_576);
    }

    #[test]
    fn empty_name_is_missing() {
        let toml = r#"
[project]
name = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "project.name"
            }
        ));
    }

    #[test]
    fn missing_project_section_is_parse_error() {
        let err = load_config_from_str("[cache]\ncompress = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref file, .. } if file == "holo.toml"));
    }

    #[test]
    fn zero_max_size_rejected() {
        let toml = r#"
[project]
name = "arena"

[cache]
max_size = 0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "cache.max_size",
                ..
            }
        ));
    }

    #[test]
    fn zero_ttl_rejected() {
        let toml = r#"
[project]
name = "arena"

[cache]
ttl_secs = 0
"#;
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::InvalidValue {
                field: "cache.ttl_secs",
                ..
            }
        ));
    }

    #[test]
    fn invalid_size_string_rejected() {
        let toml = r#"
[project]
name = "arena"

[cache]
max_size = "huge"
"#;
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[project]\nname = \"demo\"\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "demo");
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        match load_config(dir.path()).unwrap_err() {
            ConfigError::Read { path, .. } => assert_eq!(path, dir.path().join(CONFIG_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_error_from_directory_names_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[project\n").unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
