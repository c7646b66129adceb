//! Error types for PagePipe

use std::io;
use thiserror::Error;

/// Result type for PagePipe operations
pub type Result<T> = std::result::Result<T, PipeError>;

/// Errors that can occur in PagePipe operations
#[derive(Debug, Error)]
pub enum PipeError {
    /// Failed to create shared memory
    #[error("Failed to create shared memory '{name}': {source}")]
    ShmCreate {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to open shared memory
    #[error("Failed to open shared memory '{name}': {source}")]
    ShmOpen {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to map memory
    #[error("Failed to map memory: {0}")]
    Mmap(#[source] io::Error),

    /// Failed to set the shared memory size
    #[error("Failed to set shared memory size: {0}")]
    Truncate(#[source] io::Error),

    /// Failed to create or open a rendezvous signal
    #[error("Failed to open signal '{name}': {source}")]
    SignalCreate {
        name: String,
        #[source]
        source: io::Error,
    },

    /// A signal raise or wait failed mid-protocol
    #[error("Signal operation on '{name}' failed: {source}")]
    Signal {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Buffer range passed to the writer is out of bounds
    #[error("Invalid write range: offset {offset} + len {len} exceeds buffer of {buf_len} bytes")]
    InvalidRange {
        offset: usize,
        len: usize,
        buf_len: usize,
    },

    /// Write attempted after the message was closed
    #[error("Message writer is closed")]
    WriterClosed,

    /// Channel name too long
    #[error("Channel name too long: max {max} chars, got {got}")]
    NameTooLong { max: usize, got: usize },

    /// I/O error surfaced by a writer callback
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
