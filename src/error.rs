use thiserror::Error;

/// Longest response excerpt carried inside an error.
pub const SNIPPET_CHARS: usize = 800;

/// Fatal failures while fetching the listing. Any of these ends the run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP {status}: {body}")]
    Request { status: u16, body: String },
    #[error("unexpected response (no 'hits'): keys={keys:?} | head={snippet}")]
    ResponseShape { keys: Vec<String>, snippet: String },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// First `max` characters of `s`, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
