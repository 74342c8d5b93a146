//! Maps logical request paths onto the two supported on-disk layouts.
//!
//! A request lives either in a flat file (`<root>/<path>.json`) or in a
//! directory (`<root>/<path>/request.json`) next to its body variants. Reads
//! prefer the flat file; writes prefer the directory once it exists, so a
//! request that has acquired variants keeps being saved beside them.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::{Error, Result};

pub const RECORD_FILE: &str = "request.json";
pub const JSON_EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Flat,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
    pub path: PathBuf,
    pub layout: Layout,
}

/// Rejects logical paths that would escape the request root.
pub fn validate_logical_path(logical: &str) -> Result<()> {
    let trimmed = logical.trim_matches('/');
    if trimmed.is_empty() {
        return Err(Error::validation("request path must not be empty"));
    }
    if logical.starts_with('/') || logical.contains('\\') {
        return Err(Error::validation(format!(
            "invalid request path '{logical}': use a relative, slash-separated path"
        )));
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(Error::validation(format!(
                "invalid request path '{logical}': empty, '.' and '..' segments are not allowed"
            )));
        }
    }
    Ok(())
}

pub fn flat_path(root: &Path, logical: &str) -> PathBuf {
    root.join(format!("{}.{JSON_EXTENSION}", logical.trim_matches('/')))
}

pub fn request_dir(root: &Path, logical: &str) -> PathBuf {
    root.join(logical.trim_matches('/'))
}

pub fn directory_path(root: &Path, logical: &str) -> PathBuf {
    request_dir(root, logical).join(RECORD_FILE)
}

pub fn locate_for_read(root: &Path, logical: &str) -> Result<RecordLocation> {
    validate_logical_path(logical)?;

    let flat = flat_path(root, logical);
    if flat.is_file() {
        return Ok(RecordLocation {
            path: flat,
            layout: Layout::Flat,
        });
    }

    let nested = directory_path(root, logical);
    if nested.is_file() {
        return Ok(RecordLocation {
            path: nested,
            layout: Layout::Directory,
        });
    }

    Err(Error::not_found("request", flat))
}

/// Picks the write target and creates whatever parent directory it needs.
pub fn locate_for_write(root: &Path, logical: &str) -> Result<RecordLocation> {
    validate_logical_path(logical)?;

    let dir = request_dir(root, logical);
    if dir.is_dir() {
        return Ok(RecordLocation {
            path: dir.join(RECORD_FILE),
            layout: Layout::Directory,
        });
    }

    let flat = flat_path(root, logical);
    if let Some(parent) = flat.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::io("creating directory", parent, err))?;
    }
    debug!(path = %flat.display(), "using flat layout");
    Ok(RecordLocation {
        path: flat,
        layout: Layout::Flat,
    })
}

/// Strips a trailing `.json`, returning `None` for other files.
pub fn json_stem(name: &str) -> Option<&str> {
    name.strip_suffix(".json").filter(|stem| !stem.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn read_prefers_flat_file() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("users/get"))?;
        fs::write(root.join("users/get.json"), "{}")?;
        fs::write(root.join("users/get/request.json"), "{}")?;

        let location = locate_for_read(root, "users/get")?;
        assert_eq!(location.layout, Layout::Flat);
        assert_eq!(location.path, root.join("users/get.json"));
        Ok(())
    }

    #[test]
    fn read_falls_back_to_directory_layout() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("users/create"))?;
        fs::write(root.join("users/create/request.json"), "{}")?;

        let location = locate_for_read(root, "users/create")?;
        assert_eq!(location.layout, Layout::Directory);
        assert_eq!(location.path, root.join("users/create/request.json"));
        Ok(())
    }

    #[test]
    fn read_reports_missing_requests() {
        let temp = tempdir().unwrap();
        let err = locate_for_read(temp.path(), "nope/missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn write_prefers_existing_directory() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("orders/submit"))?;

        let location = locate_for_write(root, "orders/submit")?;
        assert_eq!(location.layout, Layout::Directory);
        assert_eq!(location.path, root.join("orders/submit/request.json"));
        Ok(())
    }

    #[test]
    fn write_creates_parents_for_flat_layout() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path();

        let location = locate_for_write(root, "deep/nested/thing")?;
        assert_eq!(location.layout, Layout::Flat);
        assert!(root.join("deep/nested").is_dir());
        assert!(!root.join("deep/nested/thing").exists());
        Ok(())
    }

    #[test]
    fn validate_logical_path_rejects_escapes() {
        assert!(validate_logical_path("users/get-users").is_ok());
        assert!(validate_logical_path("").unwrap_err().is_validation());
        assert!(validate_logical_path("/etc/passwd").unwrap_err().is_validation());
        assert!(validate_logical_path("../outside").unwrap_err().is_validation());
        assert!(validate_logical_path("a/./b").unwrap_err().is_validation());
        assert!(validate_logical_path(r"a\b").unwrap_err().is_validation());
    }

    #[test]
    fn json_stem_only_accepts_json_files() {
        assert_eq!(json_stem("admin.json"), Some("admin"));
        assert_eq!(json_stem("notes.txt"), None);
        assert_eq!(json_stem(".json"), None);
    }
}
