//! Diagnostics and error types.
//!
//! Two tiers exist. Recoverable problems (syntax, conversion, mapping) are
//! recorded as [`Diagnostic`]s in an [`ErrorLog`] while translation carries on
//! with a placeholder. Internal consistency failures abort the run as
//! [`InternalError`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Classification of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Syntax,
    Conversion,
    Mapping,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Syntax => "syntax",
            Severity::Conversion => "conversion",
            Severity::Mapping => "mapping",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded problem, tied to a source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: u32,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} error: {}", self.line, self.severity, self.message)
    }
}

/// Per-session accumulator of diagnostics, in the order they were raised.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    records: Vec<Diagnostic>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, severity: Severity, message: impl Into<String>, line: u32) {
        let message = message.into();
        tracing::trace!(line, %severity, %message, "diagnostic");
        self.records.push(Diagnostic {
            severity,
            message,
            line,
        });
    }

    pub fn syntax(&mut self, message: impl Into<String>, line: u32) {
        self.record(Severity::Syntax, message, line);
    }

    pub fn conversion(&mut self, message: impl Into<String>, line: u32) {
        self.record(Severity::Conversion, message, line);
    }

    pub fn mapping(&mut self, message: impl Into<String>, line: u32) {
        self.record(Severity::Mapping, message, line);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    /// Number of records with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.records
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }
}

/// A failure that aborts translation; never caused by bad user input.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        line: u32,
    },
    #[error("line {line}: malformed numeric literal '{lexeme}'")]
    InvalidNumber { lexeme: String, line: u32 },
    #[error("builtin table is inconsistent: {0}")]
    Builtins(#[source] MapError),
}

/// Errors raised by signature construction, definition and calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("a read-only mapping for {kind} '{name}' already exists")]
    ReadOnly { kind: &'static str, name: String },
    #[error("functions cannot have output parameters")]
    FunctionOutputs,
    #[error("functions cannot have output keywords")]
    FunctionOutputKeywords,
    #[error("incomplete or invalid parameter list: {:?}", .0)]
    InvalidParameters(Vec<usize>),
    #[error("subroutine '{name}' has {expected} parameters (defined with {got})")]
    DefinitionArity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error(
        "keywords for subroutine '{name}' are [{}] (defined with [{}])",
        .expected.join(", "),
        .got.join(", ")
    )]
    DefinitionKeywords {
        name: String,
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("subroutine '{name}' takes at most {max} parameters (called with {got})")]
    TooManyArguments { name: String, max: usize, got: usize },
    #[error("subroutine '{name}' requires at least {min} parameters (called with {got})")]
    TooFewArguments { name: String, min: usize, got: usize },
    #[error("'{keyword}' is not a valid keyword for subroutine '{name}'")]
    UnknownKeyword { keyword: String, name: String },
    #[error(
        "identifier '{keyword}' matches multiple keywords for subroutine '{name}': [{}]",
        .matches.join(", ")
    )]
    AmbiguousKeyword {
        keyword: String,
        name: String,
        matches: Vec<String>,
    },
}

/// Errors from loading or applying a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid customization: {0}")]
    Mapping(#[from] MapError),
}
