//! Region file loading with validation.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::core::context::Context;
use crate::core::region::Region;
use crate::core::validator::validate;

/// Load a region tree from a JSON file without validating it.
pub fn read_region(path: &Path) -> Result<Region> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read region {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse region {}", path.display()))
}

/// Load a region tree and check it against the structural rules.
pub fn load_region(path: &Path) -> Result<Region> {
    let region = read_region(path)?;
    validate(&region).with_context(|| format!("invalid region {}", path.display()))?;
    Ok(region)
}

/// Load, validate and compile a region file.
pub fn load_context(path: &Path) -> Result<Context> {
    let region = read_region(path)?;
    Context::new(&region).with_context(|| format!("invalid region {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sequential, task};

    fn write_region(dir: &Path, region: &Region) -> std::path::PathBuf {
        let path = dir.join("region.json");
        fs::write(&path, serde_json::to_string(region).expect("serialize")).expect("write");
        path
    }

    #[test]
    fn load_context_compiles_valid_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_region(
            temp.path(),
            &sequential("s", task("a", 1.0, &[1.0]), task("b", 1.0, &[2.0])),
        );
        let context = load_context(&path).expect("load");
        assert_eq!(context.net().transition_count(), 2);
    }

    #[test]
    fn load_region_reports_rule_violation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_region(temp.path(), &task("a", -1.0, &[1.0]));
        let err = load_region(&path).expect_err("negative duration");
        let message = format!("{err:#}");
        assert!(message.contains("invalid region"));
        assert!(message.contains("duration"));
    }

    #[test]
    fn read_region_reports_parse_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("region.json");
        fs::write(&path, "{\"id\": \"a\"}").expect("write");
        let err = read_region(&path).expect_err("missing type");
        assert!(format!("{err:#}").contains("parse region"));
    }
}
