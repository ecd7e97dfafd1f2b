//! `holo manifest`: build manifest creation and validation.

use std::collections::BTreeMap;

use holo_cache::{
    create_build_manifest, validate_build_manifest, ArtifactKind, BuildArtifact, BuildManifest,
};

use crate::{GlobalArgs, ManifestCommand};

/// Runs a `holo manifest` subcommand.
///
/// `validate` returns exit code 1 when any recorded source changed or is missing.
pub fn run(
    command: &ManifestCommand,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    match command {
        ManifestCommand::Create {
            output,
            sources,
            artifact,
        } => {
            let mut artifacts = Vec::with_capacity(artifact.len());
            for path in artifact {
                let data = std::fs::read(path)
                    .map_err(|e| format!("cannot read artifact {}: {e}", path.display()))?;
                artifacts.push(BuildArtifact::from_bytes(ArtifactKind::Bundle, &data, sources));
            }
            let manifest = create_build_manifest(sources, artifacts, BTreeMap::new())?;
            manifest.save(output)?;
            if !global.quiet {
                eprintln!(
                    "wrote manifest {} ({} sources, build {})",
                    output.display(),
                    manifest.source_hashes.len(),
                    manifest.build_id
                );
            }
            Ok(0)
        }
        ManifestCommand::Validate { manifest } => {
            let loaded = BuildManifest::load(manifest)?;
            let report = validate_build_manifest(&loaded);
            if !global.quiet {
                for path in &report.changed_files {
                    eprintln!("changed: {}", path.display());
                }
                for path in &report.missing_files {
                    eprintln!("missing: {}", path.display());
                }
                if report.valid {
                    eprintln!("build {} is up to date", loaded.build_id);
                }
            }
            Ok(if report.valid { 0 } else { 1 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn quiet() -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: None,
        }
    }

    #[test]
    fn create_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("lobby.holo");
        let bundle = dir.path().join("bundle.js");
        std::fs::write(&src, "composition Lobby {}").unwrap();
        std::fs::write(&bundle, "export default {}").unwrap();
        let output = dir.path().join("manifest.json");

        let create = ManifestCommand::Create {
            output: output.clone(),
            sources: vec![src.clone()],
            artifact: vec![bundle],
        };
        assert_eq!(run(&create, &quiet()).unwrap(), 0);

        let validate = ManifestCommand::Validate {
            manifest: output.clone(),
        };
        assert_eq!(run(&validate, &quiet()).unwrap(), 0);

        std::fs::write(&src, "composition Lobby { orb a {} }").unwrap();
        assert_eq!(run(&validate, &quiet()).unwrap(), 1);
    }

    #[test]
    fn validate_missing_manifest_errors() {
        let validate = ManifestCommand::Validate {
            manifest: PathBuf::from("/nonexistent/manifest.json"),
        };
        assert!(run(&validate, &quiet()).is_err());
    }
}
