use serde::{Deserialize, Serialize};

/// One execution request, as accepted by the gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Target language name (matched case-insensitively)
    #[serde(rename = "lang")]
    pub language: String,
    /// Submitted source code
    pub code: String,
    /// Standard-library source shipped alongside the code
    #[serde(default)]
    pub stdlib_code: String,
    /// Entry class, for backends that invoke a method instead of running a program
    #[serde(default, rename = "className")]
    pub entry_class: String,
    /// Entry method on `entry_class`
    #[serde(default, rename = "methodName")]
    pub entry_method: String,
}

impl Job {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_stdlib(mut self, stdlib_code: impl Into<String>) -> Self {
        self.stdlib_code = stdlib_code.into();
        self
    }

    pub fn with_entry(mut self, class: impl Into<String>, method: impl Into<String>) -> Self {
        self.entry_class = class.into();
        self.entry_method = method.into();
        self
    }
}

/// Request line sent to a persistent worker, and body forwarded to a proxied backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    pub cmd: String,
    pub lang: String,
    pub code: String,
    pub stdlib_code: String,
    pub class_name: String,
    pub method_name: String,
}

impl WorkerRequest {
    /// Compile request for `job`, with `lang` set to the backend's
    /// registered language name rather than the caller's spelling
    pub fn new(lang: &str, job: &Job) -> Self {
        Self {
            cmd: "compile".to_string(),
            lang: lang.to_string(),
            code: job.code.clone(),
            stdlib_code: job.stdlib_code.clone(),
            class_name: job.entry_class.clone(),
            method_name: job.entry_method.clone(),
        }
    }
}

/// Reply line produced by a persistent worker or a proxied backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerReply {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub exception_text: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub backend_version: Option<String>,
}

impl WorkerReply {
    /// Captured output, or the failure the backend reported
    pub fn into_output(self) -> crate::Result<String> {
        match (self.result, self.exception_text) {
            (_, Some(text)) => Err(crate::Error::BuildOrRuntimeFailure(text)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(crate::Error::Protocol(
                "reply carries neither result nor exceptionText".to_string(),
            )),
        }
    }
}

/// Uniform response shape returned for every job regardless of backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    pub service_version: String,
}

impl ResponseEnvelope {
    pub fn success(result: String, elapsed_ms: u64, service_version: &str) -> Self {
        Self {
            result: Some(result),
            exception_text: None,
            error_code: None,
            elapsed_ms: Some(elapsed_ms),
            service_version: service_version.to_string(),
        }
    }

    pub fn failure(error: &crate::Error, service_version: &str) -> Self {
        Self {
            result: None,
            exception_text: Some(error.to_string()),
            error_code: Some(error.error_code().to_string()),
            elapsed_ms: None,
            service_version: service_version.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exception_text.is_none()
    }
}
