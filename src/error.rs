use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Workload not found: {0}")]
    NotFound(String),

    #[error("Workload ID already in use: {0}")]
    DuplicateId(String),

    #[error("Invalid job configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Operation not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("Allocator queue is full")]
    QueueFull,

    #[error("Engine error during {operation} for {id}: {message}")]
    Engine {
        operation: &'static str,
        id: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
