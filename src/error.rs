use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatchError>;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("could not describe image: {0}")]
    ModelInference(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("invalid catalog: {0}")]
    Catalog(String),

    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MatchError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        MatchError::InvalidInput(msg.into())
    }

    /// Stable identifier shown alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::InvalidInput(_) => "INVALID_INPUT",
            MatchError::ModelInference(_) => "MODEL_INFERENCE_FAILURE",
            MatchError::Embedding(_) => "EMBEDDING_FAILURE",
            MatchError::Catalog(_) => "CATALOG_ERROR",
            MatchError::ModelLoad(_) => "MODEL_LOAD_FAILURE",
            MatchError::Io(_) => "IO_ERROR",
        }
    }
}
