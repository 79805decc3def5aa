use super::{command, ToolCheck};
use crate::registry::{BackendSpec, EphemeralBuild};

pub struct Go;

impl ToolCheck for Go {
    fn required_tools(&self) -> Vec<&str> {
        vec!["go"]
    }
}

impl Go {
    pub fn spec() -> BackendSpec {
        BackendSpec::EphemeralBuild(EphemeralBuild {
            entry_file_name: "main.go".to_string(),
            stdlib_file_name: "one.go".to_string(),
            build_command: command(&["go", "run", "main.go", "one.go"]),
            version_command: command(&["go", "version"]),
        })
    }
}
