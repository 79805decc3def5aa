use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc, time::Instant};
use tracing::{debug, error, info, warn};

use crate::{
    config::ServiceConfig,
    error::Error,
    executor::{EphemeralExecutor, Executor},
    languages,
    proxy::ProxiedBackend,
    registry::{normalize, BackendRegistry, BackendSpec},
    types::{Job, ResponseEnvelope},
    worker::WorkerChannel,
    workspace::EphemeralRunner,
    Result,
};

/// Routes jobs to the executor registered for their language and wraps every
/// outcome in a `ResponseEnvelope`.
pub struct Dispatcher {
    executors: HashMap<String, Arc<dyn Executor>>,
    service_version: String,
}

impl Dispatcher {
    /// Start every long-lived backend named by the registry.
    ///
    /// Backends that fail to start stay registered, so their jobs fail with a
    /// clear error instead of `UnknownLanguage`.
    pub async fn start(registry: &BackendRegistry, config: &ServiceConfig) -> Self {
        let timeout = config.job_timeout();
        let runner = Arc::new(EphemeralRunner::new(config.workspace_root.clone(), timeout));
        let mut executors: HashMap<String, Arc<dyn Executor>> = HashMap::new();
        if registry.is_empty() {
            warn!("No languages registered; every job will fail with unknown_language");
        }

        for (language, spec) in registry.iter() {
            if let Some(check) = languages::tool_check(language) {
                if let Err(e) = check.check_tools() {
                    warn!("{} toolchain incomplete: {}", language, e);
                }
            }

            let executor: Arc<dyn Executor> = match spec {
                BackendSpec::PersistentWorker {
                    start_command,
                    working_dir,
                    ..
                } => {
                    let dir = config.resolve_working_dir(working_dir);
                    match WorkerChannel::spawn(language, start_command, &dir, timeout) {
                        Ok(channel) => Arc::new(channel),
                        Err(e) => {
                            error!("Failed to start {} worker: {}", language, e);
                            Arc::new(WorkerChannel::dead(language))
                        }
                    }
                }
                BackendSpec::ProxiedHttp {
                    start_command,
                    working_dir,
                    port,
                    ready_check,
                    ..
                } => {
                    let dir = config.resolve_working_dir(working_dir);
                    match ProxiedBackend::start(
                        language,
                        start_command,
                        &dir,
                        *port,
                        timeout,
                        config.proxy_ready_attempts,
                        ready_check.as_ref(),
                    )
                    .await
                    {
                        Ok(backend) => Arc::new(backend),
                        Err(e) => {
                            error!("Failed to start {} backend: {}", language, e);
                            Arc::new(Unavailable(e.to_string()))
                        }
                    }
                }
                BackendSpec::EphemeralBuild(build) => {
                    Arc::new(EphemeralExecutor::new(runner.clone(), build.clone()))
                }
            };
            executors.insert(normalize(language), executor);
        }

        info!("Dispatcher ready with {} languages", registry.len());
        Self {
            executors,
            service_version: config.service_version.clone(),
        }
    }

    /// Build a dispatcher from ready-made executors
    pub fn from_executors<I, S>(executors: I, service_version: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (S, Arc<dyn Executor>)>,
        S: AsRef<str>,
    {
        Self {
            executors: executors
                .into_iter()
                .map(|(language, executor)| (normalize(language.as_ref()), executor))
                .collect(),
            service_version: service_version.into(),
        }
    }

    pub fn service_version(&self) -> &str {
        &self.service_version
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Run the job and report the result, never failing outward.
    /// `elapsedMs` covers the whole dispatch including setup and teardown.
    pub async fn handle(&self, job: &Job) -> ResponseEnvelope {
        let start = Instant::now();
        match self.run(job).await {
            Ok(result) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                info!("{} job completed in {}ms", job.language, elapsed_ms);
                ResponseEnvelope::success(result, elapsed_ms, &self.service_version)
            }
            Err(e) => {
                error!("{} job failed: {}", job.language, e);
                ResponseEnvelope::failure(&e, &self.service_version)
            }
        }
    }

    /// Run the job and return its captured stdout
    pub async fn run(&self, job: &Job) -> Result<String> {
        let executor = self
            .executors
            .get(&normalize(&job.language))
            .cloned()
            .ok_or_else(|| Error::UnknownLanguage(job.language.clone()))?;

        debug!(
            "Dispatching {} job to {}",
            job.language,
            executor.strategy()
        );

        // Detached so a dropped connection cannot abandon a worker exchange
        // halfway through; jobs always run to completion.
        let job = job.clone();
        tokio::spawn(async move { executor.execute(&job).await })
            .await
            .map_err(|e| Error::BackendUnavailable(format!("job task failed: {}", e)))?
    }

    /// Stop every long-lived backend
    pub async fn shutdown(&self) {
        for (language, executor) in &self.executors {
            debug!("Shutting down {} executor", language);
            executor.shutdown().await;
        }
    }
}

/// Stand-in for a proxied backend that could not be started
struct Unavailable(String);

#[async_trait]
impl Executor for Unavailable {
    fn strategy(&self) -> &'static str {
        "unavailable"
    }

    async fn execute(&self, _job: &Job) -> Result<String> {
        Err(Error::BackendUnavailable(self.0.clone()))
    }
}
