//! Default configuration layout for a fresh workspace.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Files written by [`make_layout`], in order.
pub const LAYOUT_FILES: &[&str] = &[
    "main.tf",
    "versions.tf",
    "terraform.tf",
    "variables.tf",
    "outputs.tf",
];

const TERRAFORM_BLOCK: &str = "
terraform {
  required_providers { }
}
";

fn contents(name: &str) -> String {
    match name {
        "terraform.tf" => TERRAFORM_BLOCK.to_string(),
        _ => format!("// {name}\n"),
    }
}

/// Write the default layout into `dir`, overwriting existing files.
pub fn make_layout(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(LAYOUT_FILES.len());
    for name in LAYOUT_FILES {
        let path = dir.join(name);
        std::fs::write(&path, contents(name))?;
        written.push(path);
    }
    log::debug!("wrote {} layout files to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_layout_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let written = make_layout(dir.path()).unwrap();
        assert_eq!(written.len(), LAYOUT_FILES.len());
        for name in LAYOUT_FILES {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }

        let terraform = std::fs::read_to_string(dir.path().join("terraform.tf")).unwrap();
        assert!(terraform.contains("required_providers { }"));
        let main = std::fs::read_to_string(dir.path().join("main.tf")).unwrap();
        assert_eq!(main, "// main.tf\n");
    }

    #[test]
    fn test_make_layout_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("outputs.tf"), "output \"x\" {}").unwrap();
        make_layout(dir.path()).unwrap();
        let outputs = std::fs::read_to_string(dir.path().join("outputs.tf")).unwrap();
        assert_eq!(outputs, "// outputs.tf\n");
    }

    #[test]
    fn test_make_layout_missing_dir() {
        assert!(make_layout(Path::new("/nonexistent/terrapin/layout")).is_err());
    }
}
