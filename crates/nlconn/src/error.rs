//! Error types for netlink operations.

use std::io;

/// Result type for netlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during netlink operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// socket(2) failed while connecting.
    #[error("cannot create netlink socket: {0}")]
    SocketCreation(#[source] io::Error),

    /// bind(2) failed while connecting. The partially-created socket has
    /// already been released when this is returned.
    #[error("cannot bind netlink socket: {0}")]
    Bind(#[source] io::Error),

    /// I/O error from a socket operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A datagram carried less payload than its header declared.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Payload length declared by the header.
        expected: usize,
        /// Payload bytes actually present in the datagram.
        actual: usize,
    },

    /// The serve loop was started before a handler was set.
    #[error("handler not set")]
    HandlerNotSet,

    /// Netlink sockets do not exist on this platform.
    #[error("netlink is not supported on this platform")]
    UnsupportedPlatform,

    /// A payload handler reported a failure.
    #[error("handler error: {0}")]
    Handler(String),
}

impl Error {
    /// Wrap a handler failure message.
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }

    /// The error every socket operation reports when no socket is open.
    pub fn not_connected() -> Self {
        Self::Io(io::Error::new(
            io::ErrorKind::NotConnected,
            "netlink socket not connected",
        ))
    }

    /// Check if this error means the socket was never opened or already
    /// closed.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::NotConnected)
    }

    /// Check if this is the fixed unsupported-platform error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedPlatform)
    }
}
