use super::{command, ToolCheck};
use crate::registry::BackendSpec;

pub struct Ruby;

impl ToolCheck for Ruby {
    fn required_tools(&self) -> Vec<&str> {
        vec!["ruby"]
    }
}

impl Ruby {
    pub fn spec() -> BackendSpec {
        BackendSpec::PersistentWorker {
            start_command: command(&["ruby", "jsonrepl.rb"]),
            working_dir: "FastCompile/Ruby".into(),
            version_command: Some(command(&["ruby", "--version"])),
        }
    }
}
