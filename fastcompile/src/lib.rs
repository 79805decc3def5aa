//! # fastcompile
//!
//! Runs submitted code snippets for a multi-language playground. Each
//! language is served by one of three strategies: a persistent worker
//! process spoken to over line-delimited JSON, a proxied HTTP backend on a
//! loopback port, or an ephemeral build in a fresh workspace.

mod config;
mod dispatcher;
mod error;
mod executor;
pub mod languages;
mod origin;
mod proxy;
mod registry;
mod types;
mod versions;
mod worker;
mod workspace;

#[cfg(test)]
mod tests;

pub use config::ServiceConfig;
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use executor::{EphemeralExecutor, Executor};
pub use origin::OriginPolicy;
pub use proxy::ProxiedBackend;
pub use registry::{BackendRegistry, BackendSpec, EphemeralBuild, ReadyCheck};
pub use types::{Job, ResponseEnvelope, WorkerReply, WorkerRequest};
pub use versions::VersionCache;
pub use worker::WorkerChannel;
pub use workspace::{EphemeralRunner, RunOutput};

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, Error>;
