use crate::series::MonthKey;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("No usable rows: {0}")]
    EmptyResult(String),

    #[error("No index value available for {0}")]
    MonthNotFound(MonthKey),

    #[error("Start index is zero, inflation is undefined")]
    DivisionByZero,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A source load that ended with an empty series; `kind` is the first reported cause.
    #[error("{source_name} could not be loaded: {message}")]
    SourceFailed {
        source_name: String,
        kind: ErrorKind,
        message: String,
    },
}

/// Coarse classification used by callers that render a message per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceUnavailable,
    MalformedInput,
    EmptyResult,
    MonthNotFound,
    DivisionByZero,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SourceUnavailable => "source_unavailable",
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::EmptyResult => "empty_result",
            ErrorKind::MonthNotFound => "month_not_found",
            ErrorKind::DivisionByZero => "division_by_zero",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

impl IpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IpcError::SourceUnavailable(_) | IpcError::Http(_) | IpcError::Io(_) => {
                ErrorKind::SourceUnavailable
            }
            IpcError::MalformedInput(_)
            | IpcError::Json(_)
            | IpcError::Csv(_)
            | IpcError::Spreadsheet(_) => ErrorKind::MalformedInput,
            IpcError::EmptyResult(_) => ErrorKind::EmptyResult,
            IpcError::MonthNotFound(_) => ErrorKind::MonthNotFound,
            IpcError::DivisionByZero => ErrorKind::DivisionByZero,
            IpcError::Toml(_) | IpcError::Config(_) => ErrorKind::Config,
            IpcError::SourceFailed { kind, .. } => *kind,
        }
    }
}

pub type Result<T> = std::result::Result<T, IpcError>;
