//! `holo diff`: compare two composition snapshots.

use std::path::Path;

use holo_diff::{ChangeType, DiffResult, NodeKind};
use holo_scene::Composition;

use crate::{DiffArgs, GlobalArgs, ReportFormat};

/// Loads a composition snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<Composition, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let snapshot: Composition = serde_json::from_str(&content)
        .map_err(|e| format!("invalid snapshot {}: {e}", path.display()))?;
    Ok(snapshot)
}

/// Runs `holo diff`. Returns exit code 1 if the snapshots differ, 0 otherwise.
pub fn run(args: &DiffArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let old = load_snapshot(&args.old)?;
    let new = load_snapshot(&args.new)?;
    let result = holo_diff::diff(Some(&old), &new);

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        ReportFormat::Text => {
            if !global.quiet {
                print!("{}", render_text(&result));
            }
        }
    }
    Ok(i32::from(result.has_changes))
}

/// Renders a diff as one line per change followed by an object summary.
pub fn render_text(result: &DiffResult) -> String {
    let mut out = String::new();
    for change in &result.changes {
        let marker = match change.change_type {
            ChangeType::Added => '+',
            ChangeType::Removed => '-',
            ChangeType::Modified => '~',
            ChangeType::Unchanged => ' ',
        };
        let kind = node_label(change.node_type);
        out.push_str(&format!("{marker} {kind:<11} {}", change.path.join(".")));
        if change.node_type != NodeKind::Object {
            match (&change.old_value, &change.new_value) {
                (Some(old), Some(new)) => out.push_str(&format!(": {old} -> {new}")),
                (None, Some(value)) | (Some(value), None) => out.push_str(&format!(": {value}")),
                (None, None) => {}
            }
        }
        out.push('\n');
    }
    out.push_str(&format!(
        "{} added, {} removed, {} modified, {} unchanged\n",
        result.added_objects.len(),
        result.removed_objects.len(),
        result.modified_objects.len(),
        result.unchanged_objects.len()
    ));
    out
}

fn node_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Object => "object",
        NodeKind::Property => "property",
        NodeKind::Trait => "trait",
        NodeKind::Logic => "logic",
        NodeKind::Composition => "composition",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holo_scene::ObjectDecl;
    use serde_json::json;

    #[test]
    fn render_property_change() {
        let old = Composition::new("Demo")
            .with_object(ObjectDecl::new("myOrb").with_property("radius", json!(1)));
        let new = Composition::new("Demo")
            .with_object(ObjectDecl::new("myOrb").with_property("radius", json!(2)));
        let text = render_text(&holo_diff::diff(Some(&old), &new));
        assert!(text.contains("~ property    Demo.myOrb.radius: 1 -> 2"));
        assert!(text.ends_with("0 added, 0 removed, 1 modified, 0 unchanged\n"));
    }

    #[test]
    fn load_snapshot_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        std::fs::write(
            &path,
            r#"{"name":"Demo","objects":[{"name":"ball","traits":["grabbable",{"name":"physics","config":{"mass":1}}]}]}"#,
        )
        .unwrap();
        let snapshot = load_snapshot(&path).unwrap();
        assert_eq!(snapshot.objects[0].trait_usages().len(), 2);
    }

    #[test]
    fn load_snapshot_reports_path() {
        let err = load_snapshot(Path::new("/nonexistent/scene.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scene.json"));
    }
}
