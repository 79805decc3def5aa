//! Backends that run their own HTTP server on a loopback port.

use async_trait::async_trait;
use std::{path::Path, process::Stdio, time::Duration};
use tokio::{
    net::TcpStream,
    process::{Child, Command},
    sync::Mutex,
    time,
};
use tracing::{debug, info, warn};

use crate::{
    error::Error,
    executor::Executor,
    registry::ReadyCheck,
    types::{Job, WorkerReply, WorkerRequest},
    workspace::resolve_program,
    Result,
};

/// A started HTTP backend child plus the client used to reach it
pub struct ProxiedBackend {
    language: String,
    port: u16,
    client: reqwest::Client,
    timeout: Option<Duration>,
    child: Mutex<Option<Child>>,
}

impl ProxiedBackend {
    /// Spawn the backend and wait until its port accepts connections, then
    /// run `ready_check` against it if one is given.
    ///
    /// A backend that never becomes ready is still returned; its jobs fail
    /// with `BackendUnavailable` until it starts listening. A backend that
    /// answers the check wrongly is not returned, and its child is killed.
    pub async fn start(
        language: &str,
        command: &[String],
        working_dir: &Path,
        port: u16,
        timeout: Option<Duration>,
        ready_attempts: u32,
        ready_check: Option<&ReadyCheck>,
    ) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Config(format!("{}: empty start command", language)))?;
        let program = resolve_program(program, working_dir)?;
        let port_text = port.to_string();

        let child = Command::new(&program)
            .args(args.iter().map(|arg| arg.replace("{port}", &port_text)))
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::BackendUnavailable(format!(
                    "{}: failed to spawn '{}': {}",
                    language,
                    program.display(),
                    e
                ))
            })?;

        info!(
            "Started {} backend (pid {:?}) on port {}",
            language,
            child.id(),
            port
        );

        let backend = Self::attach(language, port, timeout)?;
        *backend.child.lock().await = Some(child);

        if !backend.wait_ready(ready_attempts).await {
            warn!(
                "{} backend did not answer on port {} after {} attempts; jobs will fail until it does",
                language, port, ready_attempts
            );
            return Ok(backend);
        }

        if let Some(check) = ready_check {
            if let Err(e) = backend.self_test(check).await {
                warn!("{} backend will be disabled: {}", language, e);
                return Err(e);
            }
        }
        info!("{} backend is ready", language);
        Ok(backend)
    }

    /// Use a backend that is already listening on `port`, without owning a child
    pub fn attach(language: &str, port: u16, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(limit) = timeout {
            builder = builder.timeout(limit);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            language: language.to_string(),
            port,
            client,
            timeout,
            child: Mutex::new(None),
        })
    }

    /// Poll the port with a linear back-off of 100ms per attempt
    pub async fn wait_ready(&self, attempts: u32) -> bool {
        for attempt in 1..=attempts {
            time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
            debug!(
                "Checking {} backend's status ({} / {})...",
                self.language, attempt, attempts
            );
            if TcpStream::connect(("127.0.0.1", self.port)).await.is_ok() {
                return true;
            }
        }
        false
    }

    /// Send the check's job and compare the answer with the expected result
    pub async fn self_test(&self, check: &ReadyCheck) -> Result<()> {
        let job = Job::new(self.language.as_str(), check.code.as_str())
            .with_entry(check.class_name.as_str(), check.method_name.as_str());
        let output = self.forward(&job).await?.into_output()?;
        debug!("{} backend's test response: {:?}", self.language, output);

        if output.trim_end() != check.expected {
            return Err(Error::BackendUnavailable(format!(
                "{} backend failed its self-test: expected {:?}, got {:?}",
                self.language, check.expected, output
            )));
        }
        Ok(())
    }

    /// POST the job to the backend's `/compile` endpoint
    pub async fn forward(&self, job: &Job) -> Result<WorkerReply> {
        let url = format!("http://127.0.0.1:{}/compile", self.port);
        let response = self
            .client
            .post(&url)
            .json(&WorkerRequest::new(&self.language, job))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        match serde_json::from_slice::<WorkerReply>(&body) {
            Ok(reply) => Ok(reply),
            Err(e) if status.is_success() => Err(Error::Protocol(format!(
                "Malformed reply from {} backend: {}",
                self.language, e
            ))),
            Err(_) => Err(Error::BackendUnavailable(format!(
                "{} backend answered {}: {}",
                self.language,
                status,
                String::from_utf8_lossy(&body)
            ))),
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.timeout.map(|t| t.as_secs()).unwrap_or_default())
        } else {
            Error::BackendUnavailable(format!("{}: {}", self.language, e))
        }
    }
}

#[async_trait]
impl Executor for ProxiedBackend {
    fn strategy(&self) -> &'static str {
        "proxied_http"
    }

    async fn execute(&self, job: &Job) -> Result<String> {
        self.forward(job).await?.into_output()
    }

    async fn shutdown(&self) {
        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };
        // The backends stop on a newline or EOF on stdin
        drop(child.stdin.take());
        match time::timeout(Duration::from_secs(2), child.wait()).await {
            Ok(Ok(status)) => info!("{} backend exited with {}", self.language, status),
            _ => {
                warn!("{} backend did not stop, killing it", self.language);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {} backend: {}", self.language, e);
                }
            }
        }
    }
}
