use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "apiman.json";

/// Optional per-workspace settings read from `apiman.json`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct WorkspaceConfig {
    #[serde(rename = "requestsDir")]
    pub requests_dir: Option<String>,
    #[serde(rename = "environmentsDir")]
    pub environments_dir: Option<String>,
    #[serde(rename = "defaultEnvironment")]
    pub default_environment: Option<String>,
    #[serde(rename = "responseOutputDir")]
    pub response_output_dir: Option<String>,
    /// Seconds used when a request's own timeout is zero.
    #[serde(rename = "defaultTimeout")]
    pub default_timeout: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: WorkspaceConfig,
    pub path: PathBuf,
    pub dir: PathBuf,
}

/// Loads `apiman.json` from `target` (a directory or the file itself).
/// Returns `None` when no config file exists.
pub fn load_config(target: &Path) -> Result<Option<LoadedConfig>> {
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        std::env::current_dir()?.join(target)
    };

    let (file_path, dir) = if resolved.is_dir() {
        (resolved.join(CONFIG_FILE), resolved)
    } else {
        let dir = match resolved.parent() {
            Some(parent) => parent.to_path_buf(),
            None => std::env::current_dir()?,
        };
        (resolved.clone(), dir)
    };

    if !file_path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&file_path)
        .with_context(|| format!("reading config {}", file_path.display()))?;

    let config: WorkspaceConfig = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config {}", file_path.display()))?;

    Ok(Some(LoadedConfig {
        config,
        path: file_path,
        dir,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn returns_none_when_config_missing() -> Result<()> {
        let temp = tempdir()?;
        assert!(load_config(temp.path())?.is_none());
        Ok(())
    }

    #[test]
    fn loads_config_from_directory() -> Result<()> {
        let temp = tempdir()?;
        let config_path = temp.path().join(CONFIG_FILE);
        std::fs::write(
            &config_path,
            r#"{"defaultEnvironment":"staging","defaultTimeout":10}"#,
        )?;

        let loaded = load_config(temp.path())?.expect("config should load");
        assert_eq!(loaded.path, config_path);
        assert_eq!(loaded.dir, temp.path());
        assert_eq!(
            loaded.config.default_environment.as_deref(),
            Some("staging")
        );
        assert_eq!(loaded.config.default_timeout, Some(10));
        Ok(())
    }

    #[test]
    fn reports_malformed_config() -> Result<()> {
        let temp = tempdir()?;
        std::fs::write(temp.path().join(CONFIG_FILE), "{nope")?;
        let err = load_config(temp.path()).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
        Ok(())
    }
}
