use thiserror::Error;

/// Failure of a single encode or decode step.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("percent-decoded text is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed percent escape at byte {0}")]
    MalformedEscape(usize),
    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Error)]
pub enum UrlStateError {
    #[error("could not read URL parameter `{key}`: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: CodecError,
    },
    #[error("could not write URL parameter `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: CodecError,
    },
}
