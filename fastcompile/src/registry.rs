use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{error::Error, languages, Result};

/// Execution strategy for one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BackendSpec {
    /// Long-lived child speaking the line-delimited JSON protocol on stdio
    PersistentWorker {
        start_command: Vec<String>,
        working_dir: PathBuf,
        #[serde(default)]
        version_command: Option<Vec<String>>,
    },
    /// Long-lived child serving `POST /compile` on a loopback port.
    /// `{port}` in the start command is replaced with `port`.
    ProxiedHttp {
        start_command: Vec<String>,
        working_dir: PathBuf,
        port: u16,
        #[serde(default)]
        version_command: Option<Vec<String>>,
        /// Job sent once the port is open; a wrong answer disables the backend
        #[serde(default)]
        ready_check: Option<ReadyCheck>,
    },
    /// One-shot build and run in a fresh workspace
    EphemeralBuild(EphemeralBuild),
}

/// Start-up self-test for a proxied backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyCheck {
    pub code: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub method_name: String,
    /// Expected `result`, compared after trimming trailing whitespace
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralBuild {
    pub entry_file_name: String,
    pub stdlib_file_name: String,
    pub build_command: Vec<String>,
    pub version_command: Vec<String>,
}

impl BackendSpec {
    pub fn version_command(&self) -> Option<&[String]> {
        match self {
            BackendSpec::PersistentWorker {
                version_command, ..
            }
            | BackendSpec::ProxiedHttp {
                version_command, ..
            } => version_command.as_deref(),
            BackendSpec::EphemeralBuild(build) => Some(&build.version_command),
        }
    }

    /// Directory of a long-lived backend, relative to the backends dir
    pub fn working_dir(&self) -> Option<&Path> {
        match self {
            BackendSpec::PersistentWorker { working_dir, .. }
            | BackendSpec::ProxiedHttp { working_dir, .. } => Some(working_dir),
            BackendSpec::EphemeralBuild(_) => None,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        match self {
            BackendSpec::PersistentWorker { .. } => "persistent_worker",
            BackendSpec::ProxiedHttp { .. } => "proxied_http",
            BackendSpec::EphemeralBuild(_) => "ephemeral_build",
        }
    }

    fn validate(&self, language: &str) -> Result<()> {
        let command = match self {
            BackendSpec::PersistentWorker { start_command, .. }
            | BackendSpec::ProxiedHttp { start_command, .. } => start_command,
            BackendSpec::EphemeralBuild(build) => {
                if build.entry_file_name.is_empty() || build.stdlib_file_name.is_empty() {
                    return Err(Error::Config(format!(
                        "{}: entry and stdlib file names are required",
                        language
                    )));
                }
                if build.entry_file_name == build.stdlib_file_name {
                    return Err(Error::Config(format!(
                        "{}: entry and stdlib files must differ",
                        language
                    )));
                }
                &build.build_command
            }
        };
        if command.is_empty() {
            return Err(Error::Config(format!("{}: empty command", language)));
        }
        Ok(())
    }
}

/// Registered language: the name it was registered under and its strategy
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    spec: BackendSpec,
}

/// Fixed language table, keyed by lowercase language name.
///
/// Each entry keeps the name it was registered under; that name is what
/// backends see as `lang`, whatever casing the caller used.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    specs: BTreeMap<String, Entry>,
}

impl BackendRegistry {
    pub fn new<I, S>(specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, BackendSpec)>,
        S: AsRef<str>,
    {
        let mut table = BTreeMap::new();
        for (language, spec) in specs {
            let name = language.as_ref().trim();
            let key = normalize(name);
            spec.validate(&key)?;
            let entry = Entry {
                name: name.to_string(),
                spec,
            };
            if table.insert(key.clone(), entry).is_some() {
                return Err(Error::Config(format!("language registered twice: {}", key)));
            }
        }
        Ok(Self { specs: table })
    }

    /// The built-in table shipped with the service
    pub fn builtin() -> Self {
        Self {
            specs: languages::builtin_specs()
                .into_iter()
                .map(|(name, spec)| {
                    let entry = Entry {
                        name: name.to_string(),
                        spec,
                    };
                    (normalize(name), entry)
                })
                .collect(),
        }
    }

    pub fn resolve(&self, language: &str) -> Result<&BackendSpec> {
        self.specs
            .get(&normalize(language))
            .map(|entry| &entry.spec)
            .ok_or_else(|| Error::UnknownLanguage(language.to_string()))
    }

    /// Registered names and specs, ordered by lowercase name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BackendSpec)> {
        self.specs
            .values()
            .map(|entry| (entry.name.as_str(), &entry.spec))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

pub(crate) fn normalize(language: &str) -> String {
    language.trim().to_ascii_lowercase()
}
