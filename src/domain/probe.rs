use serde::Deserialize;
use std::fmt;

/// A single declarative expectation checked against a fresh container.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Probe {
    File(FileCheck),
    Http(HttpCheck),
    Command(CommandCheck),
}

impl Probe {
    pub fn file(path: impl Into<String>) -> Self {
        Self::File(FileCheck::new(path))
    }

    /// Human-readable label, explicit if one was given.
    pub fn label(&self) -> String {
        match self {
            Self::File(check) => check.label.clone().unwrap_or_else(|| format!("file {}", check.path)),
            Self::Http(check) => check
                .label
                .clone()
                .unwrap_or_else(|| format!("GET {} on port {}", check.path, check.port)),
            Self::Command(check) => check.label.clone().unwrap_or_else(|| {
                let mut words: Vec<&str> = check.entrypoint.iter().map(String::as_str).collect();
                words.extend(check.args.iter().map(String::as_str));
                if words.is_empty() {
                    "command".to_string()
                } else {
                    format!("command `{}`", words.join(" "))
                }
            }),
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileCheck {
    /// Absolute path inside the container filesystem.
    pub path: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl FileCheck {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HttpCheck {
    pub port: u16,
    #[serde(default = "default_http_path")]
    pub path: String,
    #[serde(default = "default_http_status")]
    pub status: u16,
    #[serde(default)]
    pub body_contains: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

fn default_http_path() -> String {
    "/".to_string()
}

fn default_http_status() -> u16 {
    200
}

impl HttpCheck {
    pub fn new(port: u16, path: impl Into<String>) -> Self {
        Self {
            port,
            path: path.into(),
            status: default_http_status(),
            body_contains: None,
            label: None,
        }
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn expect_body(mut self, needle: impl Into<String>) -> Self {
        self.body_contains = Some(needle.into());
        self
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CommandCheck {
    /// Replaces the first word of the exec; `args` follow it.
    #[serde(default)]
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default)]
    pub stdout_contains: Option<String>,
    #[serde(default)]
    pub stderr_contains: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl CommandCheck {
    pub fn new<I, S>(entrypoint: Option<&str>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entrypoint: entrypoint.map(str::to_string),
            args: args.into_iter().map(Into::into).collect(),
            exit_code: 0,
            stdout_contains: None,
            stderr_contains: None,
            label: None,
        }
    }

    pub fn expect_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn expect_stdout(mut self, needle: impl Into<String>) -> Self {
        self.stdout_contains = Some(needle.into());
        self
    }

    pub fn expect_stderr(mut self, needle: impl Into<String>) -> Self {
        self.stderr_contains = Some(needle.into());
        self
    }

    /// Full argv executed inside the container.
    pub fn argv(&self) -> Vec<String> {
        self.entrypoint
            .iter()
            .cloned()
            .chain(self.args.iter().cloned())
            .collect()
    }
}
