use super::{command, ToolCheck};
use crate::registry::{BackendSpec, EphemeralBuild};

pub struct CSharp;

impl ToolCheck for CSharp {
    fn required_tools(&self) -> Vec<&str> {
        vec!["mcs", "mono"]
    }
}

impl CSharp {
    pub fn spec() -> BackendSpec {
        BackendSpec::EphemeralBuild(EphemeralBuild {
            entry_file_name: "Program.cs".to_string(),
            stdlib_file_name: "one.cs".to_string(),
            build_command: command(&[
                "sh",
                "-c",
                "mcs -nologo -out:program.exe Program.cs one.cs && mono program.exe",
            ]),
            version_command: command(&["mono", "--version"]),
        })
    }
}
