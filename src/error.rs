//! Error types surfaced by the client.
use std::io;

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by [`Client`](crate::Client) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed connecting to {address}: {source}")]
    ConnectionFailed {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("communication failure: {0}")]
    CommunicationFailure(#[from] CommunicationError),

    #[error("index not found: {0}")]
    IndexNotFound(u32),

    #[error("key already exists{}", server_text(.0))]
    KeyAlreadyExists(Option<String>),

    #[error("{0} not implemented")]
    Unsupported(&'static str),
}

/// Reasons a request/response exchange failed. The affected connection has
/// always been closed by the time one of these reaches the caller.
#[derive(Debug, Error)]
pub enum CommunicationError {
    #[error("socket timed out or error: {0}")]
    Io(#[from] io::Error),

    #[error("socket timed out or error: connection closed")]
    Closed,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{context}{}", server_text(.message))]
    Rejected {
        context: String,
        message: Option<String>,
    },
}

impl CommunicationError {
    pub(crate) fn rejected(context: impl Into<String>, message: Option<String>) -> Self {
        CommunicationError::Rejected {
            context: context.into(),
            message,
        }
    }
}

impl ClientError {
    /// Raw OS error code of a failed dial, if the platform reported one.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            ClientError::ConnectionFailed { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

fn server_text(message: &Option<String>) -> String {
    match message {
        Some(text) => format!(", err: {text}"),
        None => String::new(),
    }
}
