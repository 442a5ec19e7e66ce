//! Client for the remote file naming service.
//!
//! Any OpenAI-compatible chat completions endpoint works; the model is asked
//! for a short descriptive stem and the answer is sanitized before use.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::extract_extension;
use crate::config::NamingSettings;
use crate::error::{Error, ErrorCode};

const MAX_STEM_CHARS: usize = 40;

const FILE_NAME_PROMPT: &str = "Based on the following content, generate a Linux-compatible filename \
under 40 characters that clearly describes the content. \
Use underscores instead of spaces, avoid special characters, and make it descriptive enough \
to identify the content at a glance. \
Make sure to include all relevant information, such as the date, if available. \
Do not add a file extension. \
Return only the filename, nothing else.";

pub trait NameSuggester: Send + Sync {
    /// Suggest a file name stem (no extension) for the given content.
    fn suggest_name(&self, content: &str) -> Result<String, Error>;
}

pub struct ChatCompletionsNamer {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatCompletionsNamer {
    pub fn new(settings: &NamingSettings) -> Result<Self, Error> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| Error::Other("naming.api_key is not configured".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Other(format!("Could not build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key,
            model: settings.model.clone(),
        })
    }
}

impl NameSuggester for ChatCompletionsNamer {
    fn suggest_name(&self, content: &str) -> Result<String, Error> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: FILE_NAME_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
        };
        debug!("Requesting file name from {} ({})", self.endpoint, self.model);

        let response: ChatResponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|e| Error::with_source(ErrorCode::AnalysisFailed, "Naming service request failed", e))?;

        first_choice_content(response)
    }
}

fn first_choice_content(response: ChatResponse) -> Result<String, Error> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| Error::handling(ErrorCode::AnalysisFailed, "Could not analyze file name"))
}

/// Ask `namer` for a stem for `content`, sanitize it and append the extension
/// of `path`.
pub fn suggest_file_name(namer: &dyn NameSuggester, path: &Path, content: &str) -> Result<String, Error> {
    let suggested = namer.suggest_name(content)?;
    let stem = sanitize_file_stem(&suggested);
    if stem.is_empty() {
        return Err(Error::handling(
            ErrorCode::AnalysisFailed,
            format!("Naming service returned an unusable name: {:?}", suggested),
        ));
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(match extract_extension(&file_name) {
        "" => stem,
        extension => format!("{}.{}", stem, extension),
    })
}

/// Reduce a suggested name to `[A-Za-z0-9._-]`, whitespace becoming `_`,
/// without leading dots and at most 40 characters long.
pub fn sanitize_file_stem(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned
        .trim_start_matches('.')
        .chars()
        .take(MAX_STEM_CHARS)
        .collect::<String>()
        .trim_end_matches('.')
        .to_string()
}
