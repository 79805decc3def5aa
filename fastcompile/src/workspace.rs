use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    process::Stdio,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tokio::{fs, process::Command, time};
use tracing::{debug, warn};

use crate::{error::Error, registry::EphemeralBuild, types::Job, Result};

/// Captured output of a successful ephemeral job
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
    /// Wall-clock time between spawning the build command and its exit
    pub elapsed: Duration,
}

/// Directory holding the sources of exactly one job
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    async fn create(root: &Path, language: &str, stamp: u64) -> Result<Self> {
        fs::create_dir_all(root).await.map_err(|e| {
            Error::Workspace(format!(
                "Failed to create workspace root {}: {}",
                root.display(),
                e
            ))
        })?;

        let path = root.join(format!("{}_{}", stamp, sanitize(language)));
        match fs::create_dir(&path).await {
            Ok(()) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::Workspace(format!(
                "Workspace already exists: {}",
                path.display()
            ))),
            Err(e) => Err(Error::Workspace(format!(
                "Failed to create workspace {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::Workspace(format!(
                "File name escapes the workspace: {}",
                name
            )));
        }

        let target = self.path.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, contents).await.map_err(|e| {
            Error::Workspace(format!("Failed to write {}: {}", target.display(), e))
        })?;
        Ok(target)
    }

    async fn remove(self) {
        if let Err(e) = fs::remove_dir_all(&self.path).await {
            warn!(
                "Failed to clean up workspace {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Builds and runs one job per call in its own workspace under `root`.
///
/// Workspaces are deleted when the job succeeds and kept for inspection when
/// it fails. Sweeping old failed workspaces is left to the operator.
pub struct EphemeralRunner {
    root: PathBuf,
    timeout: Option<Duration>,
    last_stamp: AtomicU64,
}

impl EphemeralRunner {
    pub fn new(root: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            root: root.into(),
            timeout,
            last_stamp: AtomicU64::new(0),
        }
    }

    /// Microsecond timestamp, strictly increasing across calls on this runner
    fn next_stamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or_default();
        let mut last = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_stamp.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    /// Run `job` with the given build. Any stderr output counts as a failure,
    /// even when the process exits 0.
    pub async fn run(&self, job: &Job, spec: &EphemeralBuild) -> Result<RunOutput> {
        let (program, args) = spec
            .build_command
            .split_first()
            .ok_or_else(|| Error::Config(format!("{}: empty build command", job.language)))?;

        let workspace = Workspace::create(&self.root, &job.language, self.next_stamp()).await?;
        workspace
            .write_file(&spec.entry_file_name, &job.code)
            .await?;
        workspace
            .write_file(&spec.stdlib_file_name, &job.stdlib_code)
            .await?;

        debug!("Ephemeral run - Workspace: {:?}", workspace.path());
        debug!("Ephemeral run - Command: {:?}", spec.build_command);

        let program = resolve_program(program, workspace.path())?;
        let mut command = Command::new(&program);
        command
            .args(args)
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let child = command.spawn().map_err(|e| {
            Error::Workspace(format!("Failed to spawn {}: {}", program.display(), e))
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match self.timeout {
            Some(limit) => match time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => {
                    warn!(
                        "Ephemeral job timed out after {:?}, keeping workspace {}",
                        limit,
                        workspace.path().display()
                    );
                    return Err(Error::Timeout(limit.as_secs()));
                }
            },
            None => child.wait_with_output().await?,
        };
        let elapsed = start.elapsed();

        if !output.status.success() || !output.stderr.is_empty() {
            warn!(
                "Ephemeral job failed ({}), keeping workspace {}",
                output.status,
                workspace.path().display()
            );
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(Error::BuildOrRuntimeFailure(if stderr.is_empty() {
                format!("Process exited with status: {}", output.status)
            } else {
                stderr
            }));
        }

        workspace.remove().await;

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            elapsed,
        })
    }
}

/// Bare names are looked up on `PATH`; paths are taken relative to `cwd`.
///
/// The result is absolute, since the child is also started inside `cwd` and
/// a relative path would be applied twice.
pub(crate) fn resolve_program(program: &str, cwd: &Path) -> Result<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        std::path::absolute(cwd.join(program)).map_err(|e| {
            Error::Workspace(format!(
                "Failed to resolve {} in {}: {}",
                program,
                cwd.display(),
                e
            ))
        })
    } else {
        which::which(program).map_err(|_| Error::CommandNotFound(program.to_string()))
    }
}

fn sanitize(language: &str) -> String {
    language
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
