use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};
use tokio::{process::Command, sync::OnceCell};
use tracing::{debug, info};

use crate::registry::BackendRegistry;

/// Toolchain version strings, queried once per process.
///
/// The first `get` runs every language's version command; later calls return
/// the same map without touching the toolchains again.
pub struct VersionCache {
    registry: Arc<BackendRegistry>,
    backends_dir: PathBuf,
    versions: OnceCell<BTreeMap<String, String>>,
}

impl VersionCache {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            backends_dir: PathBuf::from("."),
            versions: OnceCell::new(),
        }
    }

    /// Base for the working directories of long-lived backends, whose
    /// version commands run where the backend itself runs
    pub fn with_backends_dir(mut self, backends_dir: impl Into<PathBuf>) -> Self {
        self.backends_dir = backends_dir.into();
        self
    }

    pub async fn get(&self) -> &BTreeMap<String, String> {
        self.versions
            .get_or_init(|| async {
                info!("Querying toolchain versions");
                let mut versions = BTreeMap::new();
                for (language, spec) in self.registry.iter() {
                    if let Some(command) = spec.version_command() {
                        let dir = spec.working_dir().map(|dir| self.backends_dir.join(dir));
                        let version = query_version(command, dir.as_deref()).await;
                        versions.insert(language.to_string(), version);
                    }
                }
                versions
            })
            .await
    }

    pub fn is_populated(&self) -> bool {
        self.versions.initialized()
    }
}

/// Combined stdout and stderr of the version command. A non-zero exit is
/// not an error; a command that cannot start yields a description instead.
async fn query_version(command: &[String], dir: Option<&Path>) -> String {
    let Some((program, args)) = command.split_first() else {
        return String::new();
    };

    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    let output = command.output().await;

    match output {
        Ok(output) => {
            debug!("{:?} exited with {}", command, output.status);
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            text.trim().to_string()
        }
        Err(e) => format!("unavailable: {}", e),
    }
}
