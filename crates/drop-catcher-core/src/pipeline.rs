use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::analysis::{extract_extension, AnalysisResult, AnalyzerRegistry};
use crate::error::{Error, ErrorCode};
use crate::hasher;
use crate::mover;
use crate::stability::StabilityDetector;
use crate::storage::{MoveRecord, MoveRecordStore};

/// Takes one dropped file from detection to a terminal move record.
pub struct IngestionPipeline<S> {
    store: S,
    registry: AnalyzerRegistry,
    stability: StabilityDetector,
    output_dir: PathBuf,
}

impl<S: MoveRecordStore> IngestionPipeline<S> {
    pub fn new(
        store: S,
        registry: AnalyzerRegistry,
        stability: StabilityDetector,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            registry,
            stability,
            output_dir: output_dir.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Process one file-creation event.
    ///
    /// Returns `Ok(None)` when no pending record could be created; that is only
    /// logged. Otherwise exactly one terminal upsert follows the pending insert
    /// on every exit path, and errors from the attempt are returned after it.
    /// A panic inside an analyzer is recorded as an unexpected failure and then
    /// resumed.
    pub fn handle(&self, path: &Path) -> Result<Option<MoveRecord>, Error> {
        let mut record = match self.record_pending(path) {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to persist pending record for {}: {}", path.display(), e);
                return Ok(None);
            }
        };
        info!("Handling {} as record {}", path.display(), record.id);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process(path, &mut record)));
        let (result, panic_payload) = match outcome {
            Ok(Ok(())) => (Ok(()), None),
            Ok(Err(err)) => {
                note_failure(&mut record, &err);
                (Err(err), None)
            }
            Err(payload) => {
                let message = format!("Panic while handling {}: {}", path.display(), panic_message(&*payload));
                error!("{}", message);
                if let Err(e) = record.mark_unexpected(message) {
                    warn!("Record {} already terminal: {}", record.id, e);
                }
                (Ok(()), Some(payload))
            }
        };

        if !record.status.is_terminal() {
            let _ = record.mark_unexpected("Pipeline finished without a terminal status");
        }
        let persisted = self.store.upsert(&record);

        if let Some(payload) = panic_payload {
            if let Err(e) = persisted {
                error!("Failed to persist terminal record {}: {}", record.id, e);
            }
            panic::resume_unwind(payload);
        }

        match (result, persisted) {
            (Ok(()), Ok(())) => Ok(Some(record)),
            (Ok(()), Err(db_err)) => Err(db_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(db_err)) => {
                error!("Failed to persist terminal record {}: {}", record.id, db_err);
                Err(err)
            }
        }
    }

    fn record_pending(&self, path: &Path) -> Result<MoveRecord, Error> {
        let metadata = fs::metadata(path)?;
        let record = MoveRecord::pending(path, metadata.len())?;
        self.store.insert(&record)?;
        Ok(record)
    }

    fn process(&self, path: &Path, record: &mut MoveRecord) -> Result<(), Error> {
        self.stability.wait_for(path)?;
        record.content_hash = Some(hasher::hash_file(path)?);

        let file_name = record.source_file_name.clone();
        let extension = extract_extension(&file_name);
        let analyzer = match self.registry.lookup(extension) {
            Some(analyzer) => analyzer,
            None => {
                info!("No analyzer for extension: {:?}. Skipping analysis", extension);
                return record.mark_failed(
                    ErrorCode::NoAnalyzerAvailable,
                    format!("No analyzer for extension: {}", extension),
                );
            }
        };

        match analyzer.analyze(path) {
            AnalysisResult::Success { analyzed_name } => {
                validate_target_name(&analyzed_name)?;
                let target = mover::move_file(path, &self.output_dir, &analyzed_name)?;
                record.mark_succeeded(&self.output_dir, &analyzed_name)?;
                info!("Moved {} to {}", path.display(), target.display());
            }
            AnalysisResult::Incomplete { message } => {
                info!("Analysis was incomplete: {}", message);
                record.mark_failed(ErrorCode::AnalysisIncomplete, message)?;
            }
            AnalysisResult::Failure {
                reason,
                error_code,
                cause,
            } => {
                match cause {
                    Some(cause) => error!("File analysis failed: {} ({})", reason, cause),
                    None => error!("File analysis failed: {}", reason),
                }
                record.mark_failed(error_code, reason)?;
            }
        }
        Ok(())
    }
}

/// Copy an attempt's error onto its record: known categories become
/// `MOVE_FAILED` with their code, everything else `MOVE_FAILED_UNEXPECTED_ERROR`.
fn note_failure(record: &mut MoveRecord, err: &Error) {
    let marked = match err.code() {
        Some(code) => record.mark_failed(code, err.to_string()),
        None => record.mark_unexpected(err.to_string()),
    };
    if let Err(e) = marked {
        warn!("Record {} already terminal: {}", record.id, e);
    }
}

fn validate_target_name(name: &str) -> Result<(), Error> {
    let is_plain_name = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if is_plain_name {
        Ok(())
    } else {
        Err(Error::handling(
            ErrorCode::AnalysisFailed,
            format!("Analyzer produced an invalid file name: {:?}", name),
        ))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_target_name() {
        assert!(validate_target_name("Invoice_2024.pdf").is_ok());
        assert!(validate_target_name("..hidden_ok").is_ok());
        for bad in ["", ".", "..", "../escape.txt", "sub/dir.txt", "back\\slash.txt"] {
            let err = validate_target_name(bad).unwrap_err();
            assert_eq!(err.code(), Some(ErrorCode::AnalysisFailed), "{:?}", bad);
        }
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static message");
        let payload = panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(&*payload), "formatted 42");
    }
}
