use super::{command, ToolCheck};
use crate::registry::{BackendSpec, EphemeralBuild};

pub struct Swift;

impl ToolCheck for Swift {
    fn required_tools(&self) -> Vec<&str> {
        vec!["swiftc"]
    }
}

impl Swift {
    pub fn spec() -> BackendSpec {
        BackendSpec::EphemeralBuild(EphemeralBuild {
            entry_file_name: "main.swift".to_string(),
            stdlib_file_name: "one.swift".to_string(),
            build_command: command(&[
                "sh",
                "-c",
                "swiftc -suppress-warnings -o main main.swift one.swift && ./main",
            ]),
            version_command: command(&["swift", "--version"]),
        })
    }
}
