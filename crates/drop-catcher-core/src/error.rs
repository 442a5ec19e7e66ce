use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::storage::models::MoveStatus;

/// Failure categories that can be recorded on a move record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    StabilityChecksExceeded,
    FileHandlingFailed,
    FileMoveFailed,
    AnalysisIncomplete,
    AnalysisFailed,
    NoAnalyzerAvailable,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 6] = [
        ErrorCode::StabilityChecksExceeded,
        ErrorCode::FileHandlingFailed,
        ErrorCode::FileMoveFailed,
        ErrorCode::AnalysisIncomplete,
        ErrorCode::AnalysisFailed,
        ErrorCode::NoAnalyzerAvailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::StabilityChecksExceeded => "STABILITY_CHECKS_EXCEEDED",
            ErrorCode::FileHandlingFailed => "FILE_HANDLING_FAILED",
            ErrorCode::FileMoveFailed => "FILE_MOVE_FAILED",
            ErrorCode::AnalysisIncomplete => "ANALYSIS_INCOMPLETE",
            ErrorCode::AnalysisFailed => "ANALYSIS_FAILED",
            ErrorCode::NoAnalyzerAvailable => "NO_ANALYZER_AVAILABLE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| Error::Other(format!("Unknown error code: {}", s)))
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// A failure from the known taxonomy. The pipeline copies the code and
    /// message onto the move record.
    #[error("{message}")]
    Handling {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: MoveStatus, to: MoveStatus },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn handling(code: ErrorCode, message: impl Into<String>) -> Self {
        Error::Handling {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Handling {
            code,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The taxonomy code, or `None` for failures outside the known categories.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Handling { code, .. } => Some(*code),
            _ => None,
        }
    }
}
