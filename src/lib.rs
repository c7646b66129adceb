//! PagePipe - one-way message channel over a single page of shared memory
//!
//! This library moves arbitrarily large messages between one sender and one
//! receiver process on the same host, with no network stack in the path.
//! A channel is a one-page shared memory region plus four named rendezvous
//! signals; messages stream through the page as a sequence of chunks with a
//! drain handshake per chunk, so the receiver drives backpressure.
//!
//! # Architecture
//!
//! - **Sender**: owns message pacing, publishes chunks, blocks on the
//!   receiver's per-chunk and per-message acknowledgements
//! - **Receiver**: consumes each published chunk and acknowledges it; the
//!   strictly alternating handshake replaces locks entirely
//!
//! Delivery is exactly-once and in-order; one message is in flight at a time.

pub mod bindings;
pub mod channel;
pub mod error;
pub mod region;
pub mod shm;
pub mod signal;
pub mod writer;

pub use channel::{ReceiverChannel, SenderChannel};
pub use error::{PipeError, Result};
pub use writer::MessageWriter;
