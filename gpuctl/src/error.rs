use model::{ApiStatus, ErrorCode};
use std::time::Duration;

/// Why the agent turned a request down.
#[derive(Debug, thiserror::Error)]
pub enum RequestFailure {
    #[error("{0}")]
    Rejected(String),
    #[error("operation failed with {status} error, error code {code}")]
    Status { status: ApiStatus, code: ErrorCode },
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum CtlError {
    #[error("failed to parse {name}({value})")]
    Config { name: &'static str, value: String },

    #[error("could not connect to the GPU agent at {address} within {timeout:?}, is agent running? ({reason})")]
    Connection {
        address: String,
        timeout: Duration,
        reason: String,
    },

    #[error("{operation} failed, {reason}")]
    Request {
        operation: &'static str,
        reason: RequestFailure,
    },

    #[error("{operation} receive failed, {reason}")]
    Stream {
        operation: &'static str,
        reason: String,
    },

    #[error("{0}")]
    Validation(String),

    #[error("encoding output failed: {0}")]
    Encode(String),

    #[error("write output failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("interrupted")]
    Interrupted,
}

impl CtlError {
    pub fn config(name: &'static str, value: impl Into<String>) -> Self {
        CtlError::Config {
            name,
            value: value.into(),
        }
    }

    pub fn rejected(operation: &'static str, err: impl std::fmt::Display) -> Self {
        CtlError::Request {
            operation,
            reason: RequestFailure::Rejected(err.to_string()),
        }
    }

    pub fn status(operation: &'static str, status: ApiStatus, code: ErrorCode) -> Self {
        CtlError::Request {
            operation,
            reason: RequestFailure::Status { status, code },
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CtlError::Validation(msg.into())
    }
}

impl From<serde_json::Error> for CtlError {
    fn from(err: serde_json::Error) -> Self {
        CtlError::Encode(err.to_string())
    }
}

impl From<serde_yaml::Error> for CtlError {
    fn from(err: serde_yaml::Error) -> Self {
        CtlError::Encode(err.to_string())
    }
}

/// Process exit status for the outcome of a command.
pub fn exit_code<T>(result: &Result<T, CtlError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}
