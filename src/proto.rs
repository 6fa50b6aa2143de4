pub mod codec;
pub mod command;
pub mod conv;
pub mod response;
pub mod transport;

#[cfg(test)]
pub mod fake;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("I/O error: {:?}", _0)]
    Io(#[from] std::io::Error),

    #[error("Serial I/O error: {:?}", _0)]
    Serial(#[from] tokio_serial::Error),

    #[error("No measurement station found ({scanned} ports scanned)")]
    Detection { scanned: usize },

    #[error("Port {port} could not be opened: {source}")]
    PortUnavailable {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("Malformed line {line:?}: {reason}")]
    Format { line: String, reason: String },

    #[error("Protocol violation: {}", _0)]
    Protocol(String),

    #[error("Connection was closed")]
    Abort,
}

impl ProtoError {
    pub(crate) fn format(line: impl AsRef<str>, reason: impl ToString) -> Self {
        Self::Format {
            line: line.as_ref().to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtoError>;
