pub mod naming;
pub mod pdf;
pub mod text;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::NamingSettings;
use crate::error::{Error, ErrorCode};
use naming::{ChatCompletionsNamer, NameSuggester};
use pdf::{PdfAnalyzer, PDF_EXTENSION};
use text::{TextAnalyzer, TEXT_EXTENSIONS};

/// Outcome of inspecting one file's content.
#[derive(Debug)]
pub enum AnalysisResult {
    Success {
        analyzed_name: String,
    },
    /// Content is present but not enough to derive a name from.
    Incomplete {
        message: String,
    },
    Failure {
        reason: String,
        error_code: ErrorCode,
        cause: Option<Error>,
    },
}

impl AnalysisResult {
    /// Turn an analyzer error into a `Failure`, keeping its code when it has one.
    pub fn from_error(error: Error, path: &Path) -> Self {
        match error.code() {
            Some(error_code) => AnalysisResult::Failure {
                reason: error.to_string(),
                error_code,
                cause: Some(error),
            },
            None => AnalysisResult::Failure {
                reason: format!("Failed to analyze file: {}", path.display()),
                error_code: ErrorCode::AnalysisFailed,
                cause: Some(error),
            },
        }
    }
}

pub trait FileAnalyzer: Send + Sync {
    fn analyze(&self, path: &Path) -> AnalysisResult;
}

/// Analyzers keyed by lower-cased file extension.
#[derive(Default)]
pub struct AnalyzerRegistry {
    analyzers: HashMap<String, Box<dyn FileAnalyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, extension: &str, analyzer: Box<dyn FileAnalyzer>) -> Self {
        self.analyzers.insert(extension.to_lowercase(), analyzer);
        self
    }

    /// Case-insensitive exact match on the extension.
    pub fn lookup(&self, extension: &str) -> Option<&dyn FileAnalyzer> {
        self.analyzers
            .get(&extension.to_lowercase())
            .map(|analyzer| analyzer.as_ref())
    }

    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.analyzers.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

/// Registry with the PDF and text analyzers wired to the naming service, or
/// an empty registry when no API key is configured.
pub fn default_registry(settings: &NamingSettings) -> Result<AnalyzerRegistry, Error> {
    let registry = AnalyzerRegistry::new();
    if settings.api_key.is_none() {
        warn!("No naming service API key configured, no analyzers registered");
        return Ok(registry);
    }

    let namer: Arc<dyn NameSuggester> = Arc::new(ChatCompletionsNamer::new(settings)?);
    let registry = registry.register(
        PDF_EXTENSION,
        Box::new(PdfAnalyzer::new(namer.clone(), settings.max_content_chars)),
    );
    let registry = TEXT_EXTENSIONS.iter().fold(registry, |registry, extension| {
        registry.register(
            extension,
            Box::new(TextAnalyzer::new(namer.clone(), settings.max_content_chars)),
        )
    });
    info!("Analyzers registered for: {:?}", registry.extensions());
    Ok(registry)
}

/// The part of `file_name` after its last `.`. Empty when there is no dot, or
/// the dot is the first or last character.
pub fn extract_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 && dot < file_name.len() - 1 => &file_name[dot + 1..],
        _ => "",
    }
}
