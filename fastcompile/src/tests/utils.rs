use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{registry::EphemeralBuild, worker::WorkerChannel};

pub fn command(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

pub fn ephemeral(build: &[&str]) -> EphemeralBuild {
    EphemeralBuild {
        entry_file_name: "main.txt".to_string(),
        stdlib_file_name: "lib/one.txt".to_string(),
        build_command: command(build),
        version_command: command(super::fixtures::builds::VERSION),
    }
}

pub fn spawn_worker(parts: &[&str], timeout: Option<Duration>) -> WorkerChannel {
    WorkerChannel::spawn("test", &command(parts), &std::env::temp_dir(), timeout)
        .expect("failed to spawn test worker")
}

pub fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Entries directly under `dir`, sorted
pub fn entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(read) => read.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    };
    entries.sort();
    entries
}
