use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Parsing errors
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed upstream payload: {0}")]
    Payload(String),

    // Credential errors
    #[error("Credential error: {0}")]
    Credentials(String),

    // Document errors
    #[error("Document error for {path}: {source}")]
    Document {
        path: String,
        source: std::io::Error,
    },

    // Photo selection errors
    #[error("Photo directory error: {0}")]
    PhotoDir(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PlannerResult<T> = Result<T, PlannerError>;
