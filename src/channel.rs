//! Channel endpoints
//!
//! One channel connects exactly one sender and one receiver process through
//! a one-page shared region and four named signals. The sender owns message
//! pacing; the receiver drives backpressure by acknowledging each chunk.
//!
//! Handshake, per message:
//!
//! ```text
//! sender                         receiver
//!   raise SendingStarted   --->    wait SendingStarted
//!   [per chunk]
//!   raise ChunkReady       --->    wait ChunkReady, read chunk
//!   wait ChunkConsumed     <---    raise ChunkConsumed
//!   [after final chunk, message_complete = true]
//!   wait MessageConsumed   <---    raise MessageConsumed
//! ```

use crate::error::Result;
use crate::region::ChannelRegion;
use crate::signal::SignalSet;
use crate::writer::MessageWriter;
use tracing::{debug, trace};

/// Send side of a channel
///
/// Exactly one message is in flight at a time; `send_message` takes
/// `&mut self`, so sends on one channel cannot interleave.
pub struct SenderChannel {
    region: ChannelRegion,
    signals: SignalSet,
}

impl SenderChannel {
    /// Create or attach the named channel's region and signals
    ///
    /// Idempotent against the receiver doing the same: either side may start
    /// first. Construction failures surface immediately.
    pub fn open(name: &str) -> Result<Self> {
        let region = ChannelRegion::open(name)?;
        let signals = SignalSet::open(name)?;
        debug!(channel = name, "sender channel open");
        Ok(Self { region, signals })
    }

    /// Maximum payload bytes per chunk handshake
    #[inline]
    pub fn capacity(&self) -> usize {
        self.region.capacity()
    }

    /// Get the channel name
    #[inline]
    pub fn name(&self) -> &str {
        self.region.name()
    }

    /// Send one message, produced by the `write` callback
    ///
    /// Raises `SendingStarted`, hands the callback a scoped [`MessageWriter`],
    /// and runs the writer's close sequence whether the callback succeeds or
    /// fails, so the receiver is never left waiting on a half-published
    /// chunk. Blocks until the receiver confirms full consumption; a callback
    /// error propagates only after that cleanup. An unresponsive receiver
    /// blocks indefinitely.
    pub fn send_message<F>(&mut self, write: F) -> Result<()>
    where
        F: FnOnce(&mut MessageWriter<'_>) -> Result<()>,
    {
        trace!(channel = self.name(), "message sending");
        self.signals.sending_started.raise()?;

        let mut writer = MessageWriter::new(
            &self.region,
            &self.signals.chunk_ready,
            &self.signals.chunk_consumed,
        );
        let written = write(&mut writer);
        let closed = writer.close();
        drop(writer);

        self.signals.message_consumed.wait_and_clear()?;
        trace!(channel = self.name(), "message consumed");
        written.and(closed)
    }

    /// Release the channel's region and signals
    ///
    /// Equivalent to dropping the channel; consuming `self` makes a second
    /// dispose unrepresentable.
    pub fn dispose(self) {}
}

/// Receive side of a channel
///
/// Implements the conforming consumer loop: its chunk accounting mirrors the
/// sender's exactly, and there is no resynchronization if they diverge.
pub struct ReceiverChannel {
    region: ChannelRegion,
    signals: SignalSet,
}

impl ReceiverChannel {
    /// Create or attach the named channel's region and signals
    pub fn open(name: &str) -> Result<Self> {
        let region = ChannelRegion::open(name)?;
        let signals = SignalSet::open(name)?;
        debug!(channel = name, "receiver channel open");
        Ok(Self { region, signals })
    }

    /// Get the channel name
    #[inline]
    pub fn name(&self) -> &str {
        self.region.name()
    }

    /// Block until the sender delivers one complete message
    pub fn receive_message(&mut self) -> Result<Vec<u8>> {
        self.signals.sending_started.wait_and_clear()?;
        trace!(channel = self.name(), "message incoming");

        let mut message = Vec::new();
        loop {
            self.signals.chunk_ready.wait_and_clear()?;
            let len = (self.region.bytes_in_chunk() as usize).min(self.region.capacity());
            // Completion must be observed before ChunkConsumed is raised:
            // the sender resets the header as soon as the final chunk is
            // acknowledged
            let complete = self.region.message_complete();

            let start = message.len();
            message.resize(start + len, 0);
            self.region.read_payload(0, &mut message[start..]);
            trace!(bytes = len, "chunk consumed");

            self.signals.chunk_consumed.raise()?;
            if complete {
                break;
            }
        }

        self.signals.message_consumed.raise()?;
        trace!(channel = self.name(), bytes = message.len(), "message received");
        Ok(message)
    }

    /// Release the channel's region and signals
    pub fn dispose(self) {}
}
