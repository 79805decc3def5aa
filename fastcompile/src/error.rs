use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Origin not allowed: {0}")]
    OriginNotAllowed(String),

    #[error("Worker for {0} is dead")]
    WorkerDead(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    BuildOrRuntimeFailure(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Not found: {0}")]
    RouteNotFound(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable identifier reported as `errorCode` in response envelopes.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::UnknownLanguage(_) => "unknown_language",
            Error::OriginNotAllowed(_) => "origin_not_allowed",
            Error::WorkerDead(_) => "worker_dead",
            Error::Protocol(_) => "protocol_error",
            Error::BuildOrRuntimeFailure(_) => "build_or_runtime_failure",
            Error::Timeout(_) => "timeout",
            Error::MalformedRequest(_) => "malformed_request",
            Error::RouteNotFound(_) => "not_found",
            Error::Workspace(_) => "workspace_error",
            Error::BackendUnavailable(_) => "backend_unavailable",
            Error::CommandNotFound(_) => "command_not_found",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
        }
    }
}
