mod loader;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};

use crate::executor::ExecutionOptions;
use crate::resolve::{ResolveOptions, DEFAULT_TIMEOUT};
use crate::store::{Store, ENVIRONMENTS_DIR, REQUESTS_DIR};

pub use loader::{load_config, LoadedConfig, WorkspaceConfig, CONFIG_FILE};

pub const FALLBACK_ENVIRONMENT: &str = "dev";

/// Workspace settings after merging command-line overrides with `apiman.json`.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub requests_dir: PathBuf,
    pub environments_dir: PathBuf,
    pub default_environment: String,
    pub response_output_dir: Option<PathBuf>,
    pub default_timeout: Duration,
}

impl Workspace {
    pub fn resolve(
        root: PathBuf,
        config: Option<&LoadedConfig>,
        explicit_output_dir: Option<PathBuf>,
    ) -> Self {
        let settings = config.map(|c| &c.config);
        let config_dir = config.map(|c| c.dir.clone()).unwrap_or_else(|| root.clone());

        let dir_setting = |value: Option<&String>, default: &str| match value {
            Some(dir) => resolve_relative(&config_dir, dir),
            None => root.join(default),
        };

        let requests_dir = dir_setting(settings.and_then(|s| s.requests_dir.as_ref()), REQUESTS_DIR);
        let environments_dir = dir_setting(
            settings.and_then(|s| s.environments_dir.as_ref()),
            ENVIRONMENTS_DIR,
        );

        let response_output_dir = explicit_output_dir.or_else(|| {
            settings
                .and_then(|s| s.response_output_dir.as_ref())
                .map(|dir| resolve_relative(&config_dir, dir))
        });

        Self {
            requests_dir,
            environments_dir,
            default_environment: settings
                .and_then(|s| s.default_environment.clone())
                .unwrap_or_else(|| FALLBACK_ENVIRONMENT.to_string()),
            response_output_dir,
            default_timeout: settings
                .and_then(|s| s.default_timeout)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            root,
        }
    }

    pub fn open_store(&self) -> Result<Store> {
        Store::with_dirs(self.requests_dir.clone(), self.environments_dir.clone())
            .with_context(|| format!("opening workspace {}", self.root.display()))
    }

    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            resolve: ResolveOptions {
                default_timeout: self.default_timeout,
            },
            response_output_dir: self.response_output_dir.clone(),
        }
    }
}

fn resolve_relative(base: &Path, value: &str) -> PathBuf {
    let candidate = Path::new(value);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}
