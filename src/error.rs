use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum Error {
    /// Operation attempted in a connection state that forbids it
    #[error("invalid transport state: {0}")]
    InvalidState(&'static str),

    /// The connector could not pair the requested link identity
    #[error("no peer available for link identity: {0}")]
    PeerUnavailable(String),

    /// Send or enqueue attempted after the receiving side closed its queue
    #[error("peer queue closed")]
    QueueClosed,

    /// attach() called while a handler is already attached
    #[error("a transport handler is already attached")]
    AlreadyAttached,

    /// Operation requires an attached handler
    #[error("no transport handler attached")]
    NotAttached,

    /// A pending connect was cancelled by disconnect()
    #[error("connect aborted by disconnect")]
    ConnectionAborted,
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, Error>;
