use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::naming::{suggest_file_name, NameSuggester};
use super::{AnalysisResult, FileAnalyzer};
use crate::error::{Error, ErrorCode};

pub const TEXT_EXTENSIONS: [&str; 4] = ["txt", "md", "csv", "log"];

/// Names plain-text files from their leading content. The original extension
/// is kept on the suggested name.
pub struct TextAnalyzer {
    namer: Arc<dyn NameSuggester>,
    max_content_chars: usize,
}

impl TextAnalyzer {
    pub fn new(namer: Arc<dyn NameSuggester>, max_content_chars: usize) -> Self {
        Self {
            namer,
            max_content_chars,
        }
    }

    fn try_analyze(&self, path: &Path) -> Result<AnalysisResult, Error> {
        let content = self.read_leading_text(path)?;
        if content.trim().is_empty() {
            return Ok(AnalysisResult::Incomplete {
                message: format!("File contains no text to analyze: {}", path.display()),
            });
        }

        let analyzed_name = suggest_file_name(self.namer.as_ref(), path, &content)?;
        info!("Analyzed file name for file {}: {}", path.display(), analyzed_name);
        Ok(AnalysisResult::Success { analyzed_name })
    }

    fn read_leading_text(&self, path: &Path) -> Result<String, Error> {
        // A UTF-8 char is at most 4 bytes.
        let byte_budget = (self.max_content_chars as u64).saturating_mul(4);
        let mut bytes = Vec::new();
        File::open(path)
            .and_then(|file| file.take(byte_budget).read_to_end(&mut bytes))
            .map_err(|e| {
                Error::with_source(
                    ErrorCode::FileHandlingFailed,
                    format!("Could not read file for analysis: {}", path.display()),
                    e,
                )
            })?;
        Ok(String::from_utf8_lossy(&bytes)
            .chars()
            .take(self.max_content_chars)
            .collect())
    }
}

impl FileAnalyzer for TextAnalyzer {
    fn analyze(&self, path: &Path) -> AnalysisResult {
        self.try_analyze(path)
            .unwrap_or_else(|error| AnalysisResult::from_error(error, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    struct RecordingNamer {
        answer: Result<&'static str, ErrorCode>,
        seen: Mutex<Vec<String>>,
    }

    impl RecordingNamer {
        fn answering(answer: &'static str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(code: ErrorCode) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(code),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl NameSuggester for RecordingNamer {
        fn suggest_name(&self, content: &str) -> Result<String, Error> {
            self.seen.lock().unwrap().push(content.to_string());
            self.answer
                .map(str::to_string)
                .map_err(|code| Error::handling(code, "service unavailable"))
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_success_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "scan_0001.TXT", "Rent agreement, March 2024");
        let namer = RecordingNamer::answering("Rent Agreement 2024-03");
        let analyzer = TextAnalyzer::new(namer.clone(), 4000);

        match analyzer.analyze(&path) {
            AnalysisResult::Success { analyzed_name } => {
                assert_eq!(analyzed_name, "Rent_Agreement_2024-03.TXT")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(namer.seen.lock().unwrap()[0], "Rent agreement, March 2024");
    }

    #[test]
    fn test_content_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "long.md", &"x".repeat(500));
        let namer = RecordingNamer::answering("Long_Notes");
        let analyzer = TextAnalyzer::new(namer.clone(), 100);

        assert!(matches!(analyzer.analyze(&path), AnalysisResult::Success { .. }));
        assert_eq!(namer.seen.lock().unwrap()[0].len(), 100);
    }

    #[test]
    fn test_blank_file_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "blank.txt", "  \n\t ");
        let namer = RecordingNamer::answering("unused");
        let analyzer = TextAnalyzer::new(namer.clone(), 4000);

        match analyzer.analyze(&path) {
            AnalysisResult::Incomplete { message } => assert!(message.contains("no text")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(namer.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_service_failure_keeps_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.txt", "hello");
        let analyzer = TextAnalyzer::new(RecordingNamer::failing(ErrorCode::AnalysisFailed), 4000);

        match analyzer.analyze(&path) {
            AnalysisResult::Failure { reason, error_code, cause } => {
                assert_eq!(error_code, ErrorCode::AnalysisFailed);
                assert_eq!(reason, "service unavailable");
                assert!(cause.is_some());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unusable_name_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.txt", "hello");
        let analyzer = TextAnalyzer::new(RecordingNamer::answering("???"), 4000);

        assert!(matches!(
            analyzer.analyze(&path),
            AnalysisResult::Failure { error_code: ErrorCode::AnalysisFailed, .. }
        ));
    }
}
