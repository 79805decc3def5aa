use super::{command, ToolCheck};
use crate::registry::{BackendSpec, EphemeralBuild};

pub struct Perl;

impl ToolCheck for Perl {
    fn required_tools(&self) -> Vec<&str> {
        vec!["perl"]
    }
}

impl Perl {
    pub fn spec() -> BackendSpec {
        BackendSpec::EphemeralBuild(EphemeralBuild {
            entry_file_name: "main.pl".to_string(),
            stdlib_file_name: "one.pm".to_string(),
            build_command: command(&["perl", "-I.", "main.pl"]),
            version_command: command(&["perl", "-v"]),
        })
    }
}
