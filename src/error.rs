use thiserror::Error;

/// Failures talking to the paper metadata source.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("arXiv API returned status {0}")]
    ApiError(u16),

    #[error("Failed to parse arXiv feed: {0}")]
    ParseError(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Failures from a chat-completion provider.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    ResponseParse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Model output that could not be turned into the expected record.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unexpected JSON shape: expected {0}")]
    UnexpectedShape(&'static str),
}

/// Failures from the embedding backend.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Embedding API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed embedding response: {0}")]
    ResponseParse(String),
}

/// Failures from the session store.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session {name} is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("Invalid session name: {0:?}")]
    InvalidName(String),

    #[error("Embedding backend unavailable")]
    EmbeddingUnavailable,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Any failure surfaced by a research workflow.
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
