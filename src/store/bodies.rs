//! Named body variants stored as sibling JSON files of a request record.

use std::{collections::BTreeSet, fs, path::PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};

use super::{layout, Store};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyListing {
    pub variants: BTreeSet<String>,
    /// Name of the active variant, empty when the inline body is used.
    pub active: String,
}

impl BodyListing {
    pub fn is_active(&self, name: &str) -> bool {
        !self.active.is_empty() && self.active == name
    }
}

impl Store {
    pub fn list_bodies(&self, logical: &str) -> Result<BodyListing> {
        let record = self.load_request(logical)?;
        let dir = self.request_dir(logical);

        let mut variants = BTreeSet::new();
        if dir.is_dir() {
            let entries = fs::read_dir(&dir).map_err(|err| Error::io("reading directory", &dir, err))?;
            for entry in entries {
                let entry = entry.map_err(|err| Error::io("reading directory", &dir, err))?;
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                if name == layout::RECORD_FILE || !entry.path().is_file() {
                    continue;
                }
                if let Some(stem) = layout::json_stem(name) {
                    variants.insert(stem.to_string());
                }
            }
        }

        Ok(BodyListing {
            variants,
            active: record.active_body,
        })
    }

    pub fn body_path(&self, logical: &str, name: &str) -> Result<PathBuf> {
        validate_variant_name(name)?;
        Ok(self.request_dir(logical).join(format!("{name}.json")))
    }

    pub fn read_body(&self, logical: &str, name: &str) -> Result<String> {
        let path = self.body_path(logical, name)?;
        fs::read_to_string(&path).map_err(|err| Error::from_read("body variant", &path, err))
    }

    pub fn set_active_body(&self, logical: &str, name: &str) -> Result<()> {
        let mut record = self.load_request(logical)?;
        let path = self.body_path(logical, name)?;
        if !path.is_file() {
            return Err(Error::validation(format!(
                "body file '{name}.json' does not exist in {logical}"
            )));
        }

        record.active_body = name.to_string();
        self.save_request(logical, &record)?;
        info!(request = logical, body = name, "activated body variant");
        Ok(())
    }

    pub fn remove_body(&self, logical: &str, name: &str) -> Result<()> {
        let mut record = self.load_request(logical)?;
        let dir = self.request_dir(logical);
        if is_reserved_name(name) {
            return Err(Error::not_found("body variant", dir.join(layout::RECORD_FILE)));
        }
        let path = self.body_path(logical, name)?;
        if !path.is_file() {
            return Err(Error::not_found("body variant", path));
        }
        fs::remove_file(&path).map_err(|err| Error::io("removing", &path, err))?;
        debug!(path = %path.display(), "removed body variant");

        if record.active_body == name {
            record.active_body.clear();
            self.save_request(logical, &record)?;
            info!(request = logical, body = name, "cleared active body");
        }
        Ok(())
    }

    /// Writes a new variant, creating the request directory when the record
    /// is still flat.
    pub fn add_body(&self, logical: &str, name: &str, contents: &str, overwrite: bool) -> Result<()> {
        self.locate_request(logical)?;
        let path = self.body_path(logical, name)?;
        if path.exists() && !overwrite {
            return Err(Error::validation(format!(
                "body file '{name}.json' already exists in {logical}"
            )));
        }

        let dir = self.request_dir(logical);
        fs::create_dir_all(&dir).map_err(|err| Error::io("creating directory", &dir, err))?;
        fs::write(&path, contents).map_err(|err| Error::io("writing", &path, err))?;
        debug!(path = %path.display(), "wrote body variant");
        Ok(())
    }
}

/// `request` names the record file, never a variant.
fn is_reserved_name(name: &str) -> bool {
    layout::json_stem(layout::RECORD_FILE) == Some(name)
}

fn validate_variant_name(name: &str) -> Result<()> {
    if name.is_empty()
        || is_reserved_name(name)
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
    {
        return Err(Error::validation(format!("invalid body name '{name}'")));
    }
    Ok(())
}
