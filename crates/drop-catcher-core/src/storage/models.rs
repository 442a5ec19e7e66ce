use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, ErrorCode};

/// Lifecycle of a move record. `Pending` is the only initial state and every
/// other state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveStatus {
    Pending,
    Succeeded,
    MoveFailed,
    MoveFailedUnexpectedError,
}

impl MoveStatus {
    pub const ALL: [MoveStatus; 4] = [
        MoveStatus::Pending,
        MoveStatus::Succeeded,
        MoveStatus::MoveFailed,
        MoveStatus::MoveFailedUnexpectedError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveStatus::Pending => "PENDING",
            MoveStatus::Succeeded => "SUCCEEDED",
            MoveStatus::MoveFailed => "MOVE_FAILED",
            MoveStatus::MoveFailedUnexpectedError => "MOVE_FAILED_UNEXPECTED_ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, MoveStatus::Pending)
    }
}

impl fmt::Display for MoveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoveStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoveStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::Other(format!("Unknown move status: {}", s)))
    }
}

/// Audit row for one observed file, from detection to its terminal outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub source_directory: String,
    pub source_file_name: String,
    /// Size in bytes when the file was first detected.
    pub file_size: i64,
    /// Hex BLAKE3 digest of the stable file content.
    pub content_hash: Option<String>,
    pub status: MoveStatus,
    pub move_completed_at: Option<DateTime<Utc>>,
    pub target_directory: Option<String>,
    pub target_file_name: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
}

impl MoveRecord {
    pub fn pending(path: &Path, file_size: u64) -> Result<MoveRecord, Error> {
        let source_file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Other(format!("Path has no file name: {}", path.display())))?;
        let file_size = i64::try_from(file_size).map_err(|_| {
            Error::handling(
                ErrorCode::FileHandlingFailed,
                format!("File size {} out of range for file: {}", file_size, path.display()),
            )
        })?;
        let source_directory = path
            .parent()
            .map(|parent| parent.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(MoveRecord {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            source_directory,
            source_file_name,
            file_size,
            content_hash: None,
            status: MoveStatus::Pending,
            move_completed_at: None,
            target_directory: None,
            target_file_name: None,
            error_code: None,
            error_message: None,
        })
    }

    pub fn mark_succeeded(&mut self, target_directory: &Path, target_file_name: &str) -> Result<(), Error> {
        self.transition(MoveStatus::Succeeded)?;
        self.move_completed_at = Some(Utc::now());
        self.target_directory = Some(target_directory.to_string_lossy().into_owned());
        self.target_file_name = Some(target_file_name.to_string());
        Ok(())
    }

    pub fn mark_failed(&mut self, code: ErrorCode, message: impl Into<String>) -> Result<(), Error> {
        self.transition(MoveStatus::MoveFailed)?;
        self.error_code = Some(code);
        self.error_message = Some(message.into());
        Ok(())
    }

    pub fn mark_unexpected(&mut self, message: impl Into<String>) -> Result<(), Error> {
        self.transition(MoveStatus::MoveFailedUnexpectedError)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    fn transition(&mut self, to: MoveStatus) -> Result<(), Error> {
        if self.status.is_terminal() {
            return Err(Error::IllegalTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
