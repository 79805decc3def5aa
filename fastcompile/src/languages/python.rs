use super::{command, ToolCheck};
use crate::registry::BackendSpec;

/// CPython 2 JSON-REPL worker (`jsonrepl.py` uses Python 2 syntax)
pub struct Python;

impl ToolCheck for Python {
    fn required_tools(&self) -> Vec<&str> {
        vec!["python2"]
    }
}

impl Python {
    pub fn spec() -> BackendSpec {
        BackendSpec::PersistentWorker {
            start_command: command(&["python2", "-u", "jsonrepl.py"]),
            working_dir: "FastCompile/Python".into(),
            version_command: Some(command(&["python2", "--version"])),
        }
    }
}
