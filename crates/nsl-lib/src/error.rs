use thiserror::Error;

/// Failure of a stage-triggering action. `Display` is the text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// No file selected or wrong extension; never reaches the network.
    #[error("{0}")]
    Validation(String),
    /// Transport failed and no response was received.
    #[error("{0}")]
    Network(String),
    /// Non-success status, message from the body's `error` field when present.
    #[error("{0}")]
    Server(String),
}

impl StageError {
    pub fn message(&self) -> &str {
        match self {
            StageError::Validation(msg) | StageError::Network(msg) | StageError::Server(msg) => {
                msg
            }
        }
    }
}

/// A stored stage result that the display layer cannot interpret.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("{stage} result has an unexpected shape: {source}")]
    Shape {
        stage: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
