use crate::protocol::{JsonRpcError, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpSnagError {
    #[error("failed to encode params: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("{context}: {source}")]
    Protocol {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A well-formed response whose `error` member is set. The response is
    /// kept so the caller can render the server's code/message/data.
    #[error("{error}")]
    Remote {
        error: JsonRpcError,
        response: Option<Box<Response>>,
    },

    #[error("no response from {0}")]
    MissingResponse(&'static str),

    #[error("failed to send initialized notification: {0}")]
    InitializedNotification(#[source] Box<McpSnagError>),

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpSnagError {
    pub(crate) fn protocol(context: &'static str, source: serde_json::Error) -> Self {
        McpSnagError::Protocol { context, source }
    }

    /// True when the server answered with a JSON-RPC error object.
    pub fn is_remote(&self) -> bool {
        matches!(self, McpSnagError::Remote { .. })
    }

    /// The response that carried a remote error, if any.
    pub fn response(&self) -> Option<&Response> {
        match self {
            McpSnagError::Remote { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    /// The structured JSON-RPC error for remote failures.
    pub fn remote_error(&self) -> Option<&JsonRpcError> {
        match self {
            McpSnagError::Remote { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for McpSnagError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            McpSnagError::Timeout
        } else {
            McpSnagError::Transport(err)
        }
    }
}

impl From<JsonRpcError> for McpSnagError {
    fn from(error: JsonRpcError) -> Self {
        McpSnagError::Remote {
            error,
            response: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, McpSnagError>;
