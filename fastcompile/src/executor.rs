use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::{
    registry::EphemeralBuild,
    types::Job,
    workspace::EphemeralRunner,
    Result,
};

/// One registered language's way of running a job
#[async_trait]
pub trait Executor: Send + Sync {
    /// Strategy name, for logs
    fn strategy(&self) -> &'static str;

    /// Run the job and return its captured stdout
    async fn execute(&self, job: &Job) -> Result<String>;

    /// Release long-lived resources (child processes) held by this executor
    async fn shutdown(&self) {}
}

/// Executor for an `EphemeralBuild` language: a shared runner plus the
/// language's build description
pub struct EphemeralExecutor {
    runner: Arc<EphemeralRunner>,
    spec: EphemeralBuild,
}

impl EphemeralExecutor {
    pub fn new(runner: Arc<EphemeralRunner>, spec: EphemeralBuild) -> Self {
        Self { runner, spec }
    }
}

#[async_trait]
impl Executor for EphemeralExecutor {
    fn strategy(&self) -> &'static str {
        "ephemeral_build"
    }

    async fn execute(&self, job: &Job) -> Result<String> {
        let output = self.runner.run(job, &self.spec).await?;
        debug!(
            "Build command for {} finished in {:?}",
            job.language, output.elapsed
        );
        Ok(output.stdout)
    }
}
