use super::{command, ToolCheck};
use crate::registry::{BackendSpec, EphemeralBuild};

pub struct Cpp;

impl ToolCheck for Cpp {
    fn required_tools(&self) -> Vec<&str> {
        vec!["g++"]
    }
}

impl Cpp {
    pub fn spec() -> BackendSpec {
        BackendSpec::EphemeralBuild(EphemeralBuild {
            entry_file_name: "main.cpp".to_string(),
            stdlib_file_name: "one.hpp".to_string(),
            build_command: command(&[
                "sh",
                "-c",
                "g++ -std=c++17 -o main main.cpp && ./main",
            ]),
            version_command: command(&["g++", "--version"]),
        })
    }
}
