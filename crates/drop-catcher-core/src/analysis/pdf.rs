use lopdf::Document;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::naming::{suggest_file_name, NameSuggester};
use super::{AnalysisResult, FileAnalyzer};
use crate::error::{Error, ErrorCode};

pub const PDF_EXTENSION: &str = "pdf";

/// Names PDFs from the text of their first page. Scans without a text layer
/// come back `Incomplete`.
pub struct PdfAnalyzer {
    namer: Arc<dyn NameSuggester>,
    max_content_chars: usize,
}

impl PdfAnalyzer {
    pub fn new(namer: Arc<dyn NameSuggester>, max_content_chars: usize) -> Self {
        Self {
            namer,
            max_content_chars,
        }
    }

    fn try_analyze(&self, path: &Path) -> Result<AnalysisResult, Error> {
        let content = self.first_page_text(path)?;
        if content.trim().is_empty() {
            return Ok(AnalysisResult::Incomplete {
                message: format!("PDF contains no text to analyze: {}", path.display()),
            });
        }

        let analyzed_name = suggest_file_name(self.namer.as_ref(), path, &content)?;
        info!("Analyzed file name for file {}: {}", path.display(), analyzed_name);
        Ok(AnalysisResult::Success { analyzed_name })
    }

    fn first_page_text(&self, path: &Path) -> Result<String, Error> {
        let unreadable = |e: lopdf::Error| {
            Error::handling(
                ErrorCode::AnalysisFailed,
                format!("Failed to analyze file: {} ({})", path.display(), e),
            )
        };

        let document = Document::load(path).map_err(unreadable)?;
        if !document.get_pages().contains_key(&1) {
            return Ok(String::new());
        }
        let text = document.extract_text(&[1]).map_err(unreadable)?;
        Ok(text.chars().take(self.max_content_chars).collect())
    }
}

impl FileAnalyzer for PdfAnalyzer {
    fn analyze(&self, path: &Path) -> AnalysisResult {
        self.try_analyze(path)
            .unwrap_or_else(|error| AnalysisResult::from_error(error, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SeenContent(Mutex<Vec<String>>);

    impl NameSuggester for SeenContent {
        fn suggest_name(&self, content: &str) -> Result<String, Error> {
            self.0.lock().unwrap().push(content.to_string());
            Ok("Greeting Letter".to_string())
        }
    }

    fn write_pdf(dir: &Path, name: &str, text: Option<&str>) -> PathBuf {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });
        let operations = match text {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 48.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![],
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let path = dir.join(name);
        doc.save(&path).unwrap();
        path
    }

    #[test]
    fn test_first_page_text_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "scan_0042.PDF", Some("Hello World"));
        let namer = Arc::new(SeenContent::default());
        let analyzer = PdfAnalyzer::new(namer.clone(), 4000);

        match analyzer.analyze(&path) {
            AnalysisResult::Success { analyzed_name } => assert_eq!(analyzed_name, "Greeting_Letter.PDF"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(namer.0.lock().unwrap()[0].contains("Hello"));
    }

    #[test]
    fn test_page_without_text_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "scan.pdf", None);
        let namer = Arc::new(SeenContent::default());
        let analyzer = PdfAnalyzer::new(namer.clone(), 4000);

        match analyzer.analyze(&path) {
            AnalysisResult::Incomplete { message } => {
                assert!(message.starts_with("PDF contains no text to analyze"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(namer.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unparseable_pdf_is_analysis_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();
        let analyzer = PdfAnalyzer::new(Arc::new(SeenContent::default()), 4000);

        assert!(matches!(
            analyzer.analyze(&path),
            AnalysisResult::Failure { error_code: ErrorCode::AnalysisFailed, .. }
        ));
    }
}
