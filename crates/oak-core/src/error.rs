use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no connection found for provider '{0}'")]
    MissingConnection(String),

    #[error("custom action '{0}' not found")]
    CustomActionNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating general errors with a message
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }
}
