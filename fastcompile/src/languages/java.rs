use super::{command, ToolCheck};
use crate::registry::{BackendSpec, ReadyCheck};

/// In-memory javac backend serving HTTP on its own port
pub struct Java;

pub const JAVA_PORT: u16 = 8001;

impl ToolCheck for Java {
    fn required_tools(&self) -> Vec<&str> {
        vec!["java"]
    }
}

impl Java {
    pub fn spec() -> BackendSpec {
        BackendSpec::ProxiedHttp {
            start_command: command(&[
                "java",
                "-cp",
                "target/classes:lib/*",
                "fastjavacompile.App",
                "{port}",
            ]),
            working_dir: "FastCompile/Java/fastjavacompile".into(),
            port: JAVA_PORT,
            // `java -version` prints to stderr
            version_command: Some(command(&["java", "-version"])),
            ready_check: Some(ReadyCheck {
                code: [
                    "public class TestClass {",
                    "    public String testMethod() {",
                    "        return \"Works!\";",
                    "    }",
                    "}",
                ]
                .join("\n"),
                class_name: "TestClass".to_string(),
                method_name: "testMethod".to_string(),
                expected: "Works!".to_string(),
            }),
        }
    }
}
