//! Persistent worker processes.
//!
//! A worker is a long-lived child that reads one JSON request per line on
//! stdin and answers with exactly one JSON line on stdout. The channel lock
//! keeps a single request in flight, so replies always pair with the request
//! that produced them.

use async_trait::async_trait;
use std::{path::Path, process::Stdio, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStdin, ChildStdout, Command},
    sync::Mutex,
    time,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::Error,
    executor::Executor,
    types::{Job, WorkerReply, WorkerRequest},
    workspace::resolve_program,
    Result,
};

/// Pipes of a live worker
struct WorkerIo {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl WorkerIo {
    /// Write one request line and read one reply line.
    ///
    /// Any I/O failure or end of stream means the child is gone.
    async fn exchange(&mut self, line: &[u8], language: &str) -> Result<Vec<u8>> {
        let dead = |e: std::io::Error| {
            debug!("Worker {} pipe failed: {}", language, e);
            Error::WorkerDead(language.to_string())
        };

        self.stdin.write_all(line).await.map_err(dead)?;
        self.stdin.flush().await.map_err(dead)?;

        let mut reply = Vec::new();
        let read = self.stdout.read_until(b'\n', &mut reply).await.map_err(dead)?;
        if read == 0 || reply.last() != Some(&b'\n') {
            return Err(Error::WorkerDead(language.to_string()));
        }
        reply.pop();
        Ok(reply)
    }
}

/// Line-delimited JSON channel to one persistent worker
pub struct WorkerChannel {
    language: String,
    io: Mutex<Option<WorkerIo>>,
    timeout: Option<Duration>,
}

impl WorkerChannel {
    /// Spawn the worker with `command` in `working_dir`.
    /// `language` is the registered name sent as `lang` with every job.
    pub fn spawn(
        language: &str,
        command: &[String],
        working_dir: &Path,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Config(format!("{}: empty start command", language)))?;
        let program = resolve_program(program, working_dir)?;

        let mut child = Command::new(&program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::WorkerDead(format!(
                    "{} (failed to spawn '{}': {})",
                    language,
                    program.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::WorkerDead(format!("{} (no stdin)", language)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::WorkerDead(format!("{} (no stdout)", language)))?;

        info!(
            "Started {} worker (pid {:?}) in {}",
            language,
            child.id(),
            working_dir.display()
        );

        Ok(Self {
            language: language.to_string(),
            io: Mutex::new(Some(WorkerIo {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            })),
            timeout,
        })
    }

    /// A channel whose worker never started; every submit fails with `WorkerDead`
    pub fn dead(language: &str) -> Self {
        Self {
            language: language.to_string(),
            io: Mutex::new(None),
            timeout: None,
        }
    }

    /// Send one request and wait for its reply.
    ///
    /// Concurrent callers queue on the channel lock. A dead worker stays dead;
    /// a timed-out worker is killed, since a late reply would desynchronise the
    /// stream.
    pub async fn submit(&self, request: &WorkerRequest) -> Result<WorkerReply> {
        let mut line = serde_json::to_vec(request)
            .map_err(|e| Error::Protocol(format!("Failed to encode request: {}", e)))?;
        line.push(b'\n');

        let mut guard = self.io.lock().await;
        let io = guard
            .as_mut()
            .ok_or_else(|| Error::WorkerDead(self.language.clone()))?;

        let exchanged = match self.timeout {
            Some(limit) => match time::timeout(limit, io.exchange(&line, &self.language)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "Worker {} did not answer within {:?}, killing it",
                        self.language, limit
                    );
                    *guard = None;
                    return Err(Error::Timeout(limit.as_secs()));
                }
            },
            None => io.exchange(&line, &self.language).await,
        };

        let reply = match exchanged {
            Ok(reply) => reply,
            Err(e) => {
                let status = io.child.try_wait().ok().flatten();
                error!("Worker {} died (exit status: {:?})", self.language, status);
                *guard = None;
                return Err(e);
            }
        };
        drop(guard);

        serde_json::from_slice(&reply).map_err(|e| {
            Error::Protocol(format!(
                "Malformed reply from {} worker: {} ({})",
                self.language,
                e,
                String::from_utf8_lossy(&reply)
            ))
        })
    }

    /// Whether the worker is still believed to be running
    pub async fn is_alive(&self) -> bool {
        let mut guard = self.io.lock().await;
        let exited = match guard.as_mut() {
            Some(io) => matches!(io.child.try_wait(), Ok(Some(_))),
            None => return false,
        };
        if exited {
            *guard = None;
        }
        !exited
    }

    /// Close the worker's stdin, give it `grace` to exit, then kill it
    pub async fn close(&self, grace: Duration) {
        let Some(io) = self.io.lock().await.take() else {
            return;
        };
        let WorkerIo {
            mut child, stdin, ..
        } = io;
        drop(stdin);

        match time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => info!("Worker {} exited with {}", self.language, status),
            Ok(Err(e)) => warn!("Failed to wait for worker {}: {}", self.language, e),
            Err(_) => {
                warn!("Worker {} ignored EOF, killing it", self.language);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill worker {}: {}", self.language, e);
                }
            }
        }
    }
}

#[async_trait]
impl Executor for WorkerChannel {
    fn strategy(&self) -> &'static str {
        "persistent_worker"
    }

    async fn execute(&self, job: &Job) -> Result<String> {
        self.submit(&WorkerRequest::new(&self.language, job))
            .await?
            .into_output()
    }

    async fn shutdown(&self) {
        self.close(Duration::from_secs(2)).await;
    }
}
