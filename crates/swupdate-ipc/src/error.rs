//! Error types for control-socket operations.

use crate::MsgType;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the update daemon.
#[derive(Debug, Error)]
pub enum IpcError {
    /// The control socket could not be reached
    #[error("cannot connect to {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O error on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An I/O step took longer than the configured timeout
    #[error("timed out after {}s while {stage}", timeout.as_secs_f32())]
    Timeout {
        stage: &'static str,
        timeout: Duration,
    },

    /// Frame does not start with the protocol magic
    #[error("bad frame magic {0:#010x}")]
    BadMagic(u32),

    /// Frame type outside the known message set
    #[error("unknown message type {0}")]
    UnknownType(u32),

    /// Frame body exceeds the protocol limit
    #[error("frame body of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// Body of a frame could not be decoded
    #[error("malformed {msg_type} body: {source}")]
    Body {
        msg_type: MsgType,
        #[source]
        source: serde_json::Error,
    },

    /// Message variant that cannot travel with this frame type
    #[error("{msg_type} frames must not carry a body")]
    UnexpectedBody { msg_type: MsgType },

    /// Peer closed the connection before a full frame arrived
    #[error("connection closed by the daemon")]
    Closed,

    /// Request string longer than the daemon accepts
    #[error("{field} is {len} bytes, the limit is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Daemon answered NACK
    #[error("{request} rejected by the daemon{}", reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Rejected {
        request: MsgType,
        reason: Option<String>,
    },

    /// Daemon answered with a message that does not fit the request
    #[error("unexpected {got} reply to {request}")]
    UnexpectedReply { request: MsgType, got: MsgType },
}

impl IpcError {
    /// Whether repeating the operation may succeed.
    ///
    /// A missing or refusing socket means the daemon is not up yet; a
    /// rejected install means it is busy with another update.
    pub fn is_retryable(&self) -> bool {
        match self {
            IpcError::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::NotFound
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut
            ),
            IpcError::Timeout { stage, .. } => *stage == "connecting",
            IpcError::Rejected { request, .. } => *request == MsgType::ReqInstall,
            _ => false,
        }
    }
}

/// Result type for control-socket operations.
pub type Result<T> = std::result::Result<T, IpcError>;
