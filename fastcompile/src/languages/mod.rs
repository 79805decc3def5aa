//! Built-in per-language backend table

mod cpp;
mod csharp;
mod go;
mod java;
mod javascript;
mod perl;
mod php;
mod python;
mod ruby;
mod rust;
mod swift;

pub use cpp::Cpp;
pub use csharp::CSharp;
pub use go::Go;
pub use java::{Java, JAVA_PORT};
pub use javascript::JavaScript;
pub use perl::Perl;
pub use php::Php;
pub use python::Python;
pub use ruby::Ruby;
pub use rust::Rust;
pub use swift::Swift;

use crate::{
    error::Error,
    registry::{normalize, BackendSpec},
};
use which::which;

pub trait ToolCheck {
    fn required_tools(&self) -> Vec<&str>;

    fn missing_tools(&self) -> Vec<String> {
        self.required_tools()
            .iter()
            .filter(|tool| which(tool).is_err())
            .map(|s| (*s).to_string())
            .collect()
    }

    fn check_tools(&self) -> Result<(), Error> {
        let missing = self.missing_tools();
        if !missing.is_empty() {
            return Err(Error::CommandNotFound(missing.join(", ")));
        }
        Ok(())
    }
}

/// Built-in languages under the names the playground sends
pub(crate) fn builtin_specs() -> Vec<(&'static str, BackendSpec)> {
    vec![
        ("Cpp", Cpp::spec()),
        ("CSharp", CSharp::spec()),
        ("Go", Go::spec()),
        ("Java", Java::spec()),
        ("JavaScript", JavaScript::spec()),
        ("Perl", Perl::spec()),
        ("PHP", Php::spec()),
        ("Python", Python::spec()),
        ("Ruby", Ruby::spec()),
        ("Rust", Rust::spec()),
        ("Swift", Swift::spec()),
        ("TypeScript", JavaScript::typescript_spec()),
    ]
}

/// Toolchain check for a built-in language, `None` for custom entries
pub fn tool_check(language: &str) -> Option<Box<dyn ToolCheck + Send + Sync>> {
    let check: Box<dyn ToolCheck + Send + Sync> = match normalize(language).as_str() {
        "cpp" => Box::new(Cpp),
        "csharp" => Box::new(CSharp),
        "go" => Box::new(Go),
        "java" => Box::new(Java),
        "javascript" | "typescript" => Box::new(JavaScript),
        "perl" => Box::new(Perl),
        "php" => Box::new(Php),
        "python" => Box::new(Python),
        "ruby" => Box::new(Ruby),
        "rust" => Box::new(Rust),
        "swift" => Box::new(Swift),
        _ => return None,
    };
    Some(check)
}

pub(crate) fn command(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
