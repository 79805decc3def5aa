use super::{command, ToolCheck};
use crate::registry::{BackendSpec, EphemeralBuild};

pub struct Rust;

impl ToolCheck for Rust {
    fn required_tools(&self) -> Vec<&str> {
        vec!["rustc"]
    }
}

impl Rust {
    /// Warnings from rustc land on stderr and fail the job, so the build
    /// silences them.
    pub fn spec() -> BackendSpec {
        BackendSpec::EphemeralBuild(EphemeralBuild {
            entry_file_name: "main.rs".to_string(),
            stdlib_file_name: "one.rs".to_string(),
            build_command: command(&[
                "sh",
                "-c",
                "rustc -A warnings -o main main.rs && ./main",
            ]),
            version_command: command(&["rustc", "--version"]),
        })
    }
}
