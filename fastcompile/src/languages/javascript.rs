use super::{command, ToolCheck};
use crate::registry::BackendSpec;

/// Node.js REPL worker. TypeScript runs on the same REPL script, which
/// transpiles when the request's `lang` says so; each language still gets
/// its own child process.
pub struct JavaScript;

impl ToolCheck for JavaScript {
    fn required_tools(&self) -> Vec<&str> {
        vec!["node"]
    }
}

impl JavaScript {
    pub fn spec() -> BackendSpec {
        BackendSpec::PersistentWorker {
            start_command: command(&["node", "jsonrepl.js"]),
            working_dir: "FastCompile/TypeScript".into(),
            version_command: Some(command(&["node", "--version"])),
        }
    }

    pub fn typescript_spec() -> BackendSpec {
        BackendSpec::PersistentWorker {
            start_command: command(&["node", "jsonrepl.js"]),
            working_dir: "FastCompile/TypeScript".into(),
            version_command: Some(command(&[
                "node",
                "-e",
                "console.log(require('typescript').version)",
            ])),
        }
    }
}
