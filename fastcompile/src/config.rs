use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, path::PathBuf, time::Duration};

use crate::{
    error::Error,
    registry::{BackendRegistry, BackendSpec},
    Result,
};

/// Service-wide settings, loadable from a TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Root directory of ephemeral workspaces
    pub workspace_root: PathBuf,
    /// Base for relative per-language working directories
    pub backends_dir: PathBuf,
    /// Bound on every blocking wait, in seconds; 0 disables it
    pub job_timeout_secs: u64,
    /// Readiness probe attempts for proxied backends
    pub proxy_ready_attempts: u32,
    /// Origins allowed besides loopback
    pub allowed_origins: Vec<String>,
    /// Reported as `serviceVersion` in every response
    pub service_version: String,
    /// Replaces the built-in language table when present
    pub languages: Option<BTreeMap<String, BackendSpec>>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("fastcompile"),
            backends_dir: PathBuf::from("."),
            job_timeout_secs: 30,
            proxy_ready_attempts: 10,
            allowed_origins: vec!["https://ide.onelang.io".to_string()],
            service_version: format!("fastcompile/{}", env!("CARGO_PKG_VERSION")),
            languages: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }

    /// The configured language table, or the built-in one
    pub fn registry(&self) -> Result<BackendRegistry> {
        match &self.languages {
            Some(languages) => BackendRegistry::new(languages.clone()),
            None => Ok(BackendRegistry::builtin()),
        }
    }

    pub fn resolve_working_dir(&self, working_dir: &Path) -> PathBuf {
        self.backends_dir.join(working_dir)
    }
}
