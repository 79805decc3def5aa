use super::{command, ToolCheck};
use crate::registry::BackendSpec;

pub struct Php;

impl ToolCheck for Php {
    fn required_tools(&self) -> Vec<&str> {
        vec!["php"]
    }
}

impl Php {
    pub fn spec() -> BackendSpec {
        BackendSpec::PersistentWorker {
            start_command: command(&["php", "jsonrepl.php"]),
            working_dir: "FastCompile/PHP".into(),
            version_command: Some(command(&["php", "--version"])),
        }
    }
}
