mod bodies;
pub mod layout;
mod model;
mod seed;

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

pub use bodies::BodyListing;
pub use layout::{Layout, RecordLocation};
pub use model::{AuthConfig, EnvironmentRecord, RequestRecord, StringMap};
pub use seed::SAMPLE_REQUEST;

/// Group name used by [`Store::list_requests`] for requests at the root.
pub const ROOT_GROUP: &str = "root";

pub const REQUESTS_DIR: &str = "requests";
pub const ENVIRONMENTS_DIR: &str = "environments";

/// Owns every read and write of request and environment records.
#[derive(Debug, Clone)]
pub struct Store {
    requests_dir: PathBuf,
    environments_dir: PathBuf,
}

impl Store {
    /// Opens the workspace rooted at `root` using the default directory names.
    pub fn open(root: &Path) -> Result<Self> {
        Self::with_dirs(root.join(REQUESTS_DIR), root.join(ENVIRONMENTS_DIR))
    }

    /// Creates both directories if needed and seeds empty ones.
    pub fn with_dirs(requests_dir: PathBuf, environments_dir: PathBuf) -> Result<Self> {
        for dir in [&requests_dir, &environments_dir] {
            fs::create_dir_all(dir).map_err(|err| Error::io("creating directory", dir, err))?;
        }

        let store = Self {
            requests_dir,
            environments_dir,
        };
        seed::seed_defaults(&store)?;
        Ok(store)
    }

    pub fn requests_dir(&self) -> &Path {
        &self.requests_dir
    }

    pub fn environments_dir(&self) -> &Path {
        &self.environments_dir
    }

    /// Directory that holds the directory-layout record and its variants.
    pub fn request_dir(&self, logical: &str) -> PathBuf {
        layout::request_dir(&self.requests_dir, logical)
    }

    pub fn locate_request(&self, logical: &str) -> Result<RecordLocation> {
        layout::locate_for_read(&self.requests_dir, logical)
    }

    pub fn load_request(&self, logical: &str) -> Result<RequestRecord> {
        let location = self.locate_request(logical)?;
        debug!(request = logical, path = %location.path.display(), "loading request");
        read_json("request", &location.path)
    }

    pub fn save_request(&self, logical: &str, record: &RequestRecord) -> Result<()> {
        let location = layout::locate_for_write(&self.requests_dir, logical)?;
        write_json(&location.path, record)?;
        debug!(request = logical, path = %location.path.display(), "saved request");

        if location.layout == Layout::Directory {
            let stale = layout::flat_path(&self.requests_dir, logical);
            if stale.is_file() {
                fs::remove_file(&stale).map_err(|err| Error::io("removing", &stale, err))?;
                debug!(path = %stale.display(), "migrated flat request into its directory");
            }
        }
        Ok(())
    }

    /// Removes a request. A directory-layout request takes its body variants
    /// with it, but the directory itself only goes once nothing else lives
    /// there: nested requests share it.
    pub fn delete_request(&self, logical: &str) -> Result<()> {
        layout::validate_logical_path(logical)?;

        let flat = layout::flat_path(&self.requests_dir, logical);
        if flat.is_file() {
            return fs::remove_file(&flat).map_err(|err| Error::io("removing", &flat, err));
        }

        let record = layout::directory_path(&self.requests_dir, logical);
        if record.is_file() {
            let dir = self.request_dir(logical);
            for variant in owned_variants(&dir)? {
                fs::remove_file(&variant).map_err(|err| Error::io("removing", &variant, err))?;
                debug!(path = %variant.display(), "removed body variant");
            }
            fs::remove_file(&record).map_err(|err| Error::io("removing", &record, err))?;

            if is_empty_dir(&dir)? {
                fs::remove_dir(&dir).map_err(|err| Error::io("removing", &dir, err))?;
            } else {
                debug!(path = %dir.display(), "kept request directory with remaining entries");
            }
            return Ok(());
        }

        Err(Error::not_found("request", flat))
    }

    /// Lists logical request paths grouped by their parent path.
    pub fn list_requests(&self) -> Result<BTreeMap<String, BTreeSet<String>>> {
        let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for entry in WalkDir::new(&self.requests_dir).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.requests_dir.clone());
                Error::io("walking", path, err.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(logical) = self.logical_path_for(entry.path()) else {
                continue;
            };

            let group = match logical.rsplit_once('/') {
                Some((parent, _)) => parent.to_string(),
                None => ROOT_GROUP.to_string(),
            };
            groups.entry(group).or_default().insert(logical);
        }

        Ok(groups)
    }

    /// Maps a file under the request root to its logical path, skipping
    /// non-JSON files and body variants.
    fn logical_path_for(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        let stem = layout::json_stem(name)?;
        let parent = path.parent()?;

        if name == layout::RECORD_FILE {
            if parent == self.requests_dir {
                return Some(stem.to_string());
            }
            return relative_logical(&self.requests_dir, parent);
        }

        if parent != self.requests_dir && is_variant_dir(parent) {
            return None;
        }

        relative_logical(&self.requests_dir, &parent.join(stem))
    }

    pub fn load_environment(&self, name: &str) -> Result<EnvironmentRecord> {
        let path = self.environment_path(name)?;
        read_json("environment", &path)
    }

    pub fn save_environment(&self, name: &str, record: &EnvironmentRecord) -> Result<()> {
        let path = self.environment_path(name)?;
        write_json(&path, record)
    }

    pub fn list_environments(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.environments_dir)
            .map_err(|err| Error::io("reading directory", &self.environments_dir, err))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|err| Error::io("reading directory", &self.environments_dir, err))?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(stem) = entry.file_name().to_str().and_then(layout::json_stem) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn environment_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(Error::validation(format!(
                "invalid environment name '{name}'"
            )));
        }
        Ok(self.environments_dir.join(format!("{name}.json")))
    }
}

/// A directory holds body variants when it carries a record of its own,
/// either `request.json` inside it or a flat `<dir>.json` beside it.
fn is_variant_dir(dir: &Path) -> bool {
    if dir.join(layout::RECORD_FILE).is_file() {
        return true;
    }
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(|name| dir.with_file_name(format!("{name}.json")).is_file())
        .unwrap_or(false)
}

/// JSON files in a request directory that belong to its record. Files that
/// are request records themselves (a `method` and `url` string pair) are
/// nested requests and stay.
fn owned_variants(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|err| Error::io("reading directory", dir, err))?;

    let mut variants = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| Error::io("reading directory", dir, err))?;
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name == layout::RECORD_FILE || layout::json_stem(&name).is_none() || !path.is_file() {
            continue;
        }
        if !is_request_file(&path) {
            variants.push(path);
        }
    }
    Ok(variants)
}

fn is_request_file(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(&contents) else {
        return false;
    };
    ["method", "url"]
        .iter()
        .all(|key| fields.get(*key).is_some_and(Value::is_string))
}

fn is_empty_dir(dir: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(dir).map_err(|err| Error::io("reading directory", dir, err))?;
    Ok(entries.next().is_none())
}

fn relative_logical(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(what: &'static str, path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|err| Error::from_read(what, path, err))?;
    serde_json::from_str(&contents).map_err(|err| Error::parse(path, err))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut data =
        serde_json::to_string_pretty(value).map_err(|err| Error::parse(path, err))?;
    data.push('\n');
    fs::write(path, data).map_err(|err| Error::io("writing", path, err))
}
