//! Error types for the inbound mail pipe.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures that prevent a coherent `InboundEmail` from being built.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Failed to read message stream: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("Message stream is empty")]
    Empty,

    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),
}

/// Ticket store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Fatal pipeline failures. Sender rejection is not one of these.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Email parse failed: {0}")]
    Parse(#[from] MailError),

    #[error("Ticket store dispatch failed: {0}")]
    Dispatch(#[from] DatabaseError),
}
