//! Chunked message writer
//!
//! `MessageWriter` is the write-only stream handed to the caller during a
//! send. Bytes accumulate in the shared payload buffer; whenever the buffer
//! fills to capacity the chunk is published and the writer blocks until the
//! receiver drains it (the backpressure point), then wraps and continues.
//! Arbitrarily large messages stream through the one-page region this way.
//!
//! The close sequence publishes the final partial chunk together with the
//! message-complete flag, runs one last handshake (even for a zero-length
//! message), and returns the header to the rest state. It runs on every exit
//! path of a send.

use crate::error::{PipeError, Result};
use crate::region::ChannelRegion;
use crate::signal::Signal;
use std::io;
use tracing::trace;

/// Write-only, non-seekable stream over the channel payload buffer
pub struct MessageWriter<'a> {
    region: &'a ChannelRegion,
    chunk_ready: &'a Signal,
    chunk_consumed: &'a Signal,
    // Bytes buffered in the current chunk; doubles as the write offset,
    // since every chunk starts at payload offset 0
    chunk_fill: usize,
    closed: bool,
}

impl<'a> MessageWriter<'a> {
    pub(crate) fn new(
        region: &'a ChannelRegion,
        chunk_ready: &'a Signal,
        chunk_consumed: &'a Signal,
    ) -> Self {
        Self {
            region,
            chunk_ready,
            chunk_consumed,
            chunk_fill: 0,
            closed: false,
        }
    }

    /// Write `len` bytes of `buf` starting at `offset`
    ///
    /// The range is validated before any shared state is touched; an
    /// out-of-bounds range fails with `InvalidRange` and raises no signal.
    pub fn write_from(&mut self, buf: &[u8], offset: usize, len: usize) -> Result<()> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= buf.len())
            .ok_or(PipeError::InvalidRange {
                offset,
                len,
                buf_len: buf.len(),
            })?;
        self.write_bytes(&buf[offset..end])
    }

    /// Write all of `buf`, publishing chunks as the payload buffer fills
    pub fn write_bytes(&mut self, mut buf: &[u8]) -> Result<()> {
        if self.closed {
            return Err(PipeError::WriterClosed);
        }

        let capacity = self.region.capacity();
        while !buf.is_empty() {
            let remaining = capacity - self.chunk_fill;
            if buf.len() > remaining {
                // Fill the buffer to capacity, hand the chunk over, wrap
                self.region.write_payload(self.chunk_fill, &buf[..remaining]);
                self.chunk_fill = capacity;
                self.flush_chunk()?;
                buf = &buf[remaining..];
            } else {
                self.region.write_payload(self.chunk_fill, buf);
                self.chunk_fill += buf.len();
                break;
            }
        }
        Ok(())
    }

    /// Publish the buffered chunk and block until the receiver drains it
    fn flush_chunk(&mut self) -> Result<()> {
        self.region.set_bytes_in_chunk(self.chunk_fill as u32);
        trace!(bytes = self.chunk_fill, "chunk ready");
        self.chunk_ready.raise()?;
        self.chunk_consumed.wait_and_clear()?;
        self.chunk_fill = 0;
        Ok(())
    }

    /// Finish the message and return the region to the rest state
    ///
    /// Marks the message complete, publishes any buffered bytes, and runs the
    /// final chunk handshake; a zero-length message still gets one handshake
    /// so the receiver observes completion. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.region.set_message_complete(true);
        if self.chunk_fill > 0 {
            self.region.set_bytes_in_chunk(self.chunk_fill as u32);
        }
        trace!(bytes = self.chunk_fill, "final chunk ready");
        self.chunk_ready.raise()?;
        self.chunk_consumed.wait_and_clear()?;

        self.region.reset();
        self.chunk_fill = 0;
        Ok(())
    }

    /// Whether the writer has been closed
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for MessageWriter<'_> {
    fn drop(&mut self) {
        // Backstop: the close sequence must run on every exit path, or the
        // receiver is left waiting on a half-published chunk
        if !self.closed {
            let _ = self.close();
        }
    }
}

impl io::Write for MessageWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(buf.len())
    }

    // Chunks are published at capacity and on close only
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{CHUNK_CONSUMED_SUFFIX, CHUNK_READY_SUFFIX};
    use std::thread;

    fn unique_name(tag: &str) -> String {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        format!(
            "pagepipe_test_{}_{}_{}",
            tag,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        )
    }

    fn open_chunk_signals(base: &str) -> (Signal, Signal) {
        let ready = Signal::open(&format!("{}{}", base, CHUNK_READY_SUFFIX)).unwrap();
        let consumed = Signal::open(&format!("{}{}", base, CHUNK_CONSUMED_SUFFIX)).unwrap();
        (ready, consumed)
    }

    /// Conforming consumer loop: returns the chunk sizes and the message
    fn drain_message(base: &str) -> (Vec<usize>, Vec<u8>) {
        let region = ChannelRegion::open(base).unwrap();
        let (ready, consumed) = open_chunk_signals(base);

        let mut chunks = Vec::new();
        let mut message = Vec::new();
        loop {
            ready.wait_and_clear().unwrap();
            let len = region.bytes_in_chunk() as usize;
            // Observe completion before handing the buffer back: the sender
            // resets the header right after the final ChunkConsumed
            let complete = region.message_complete();
            let mut buf = vec![0u8; len];
            region.read_payload(0, &mut buf);
            chunks.push(len);
            message.extend_from_slice(&buf);
            consumed.raise().unwrap();
            if complete {
                return (chunks, message);
            }
        }
    }

    #[test]
    fn test_small_message_single_chunk() {
        let base = unique_name("writer_small");
        let region = ChannelRegion::open(&base).unwrap();
        let (ready, consumed) = open_chunk_signals(&base);

        let consumer_base = base.clone();
        let consumer = thread::spawn(move || drain_message(&consumer_base));

        let mut writer = MessageWriter::new(&region, &ready, &consumed);
        writer.write_bytes(b"hello ").unwrap();
        writer.write_bytes(b"world").unwrap();
        writer.close().unwrap();

        let (chunks, message) = consumer.join().unwrap();
        assert_eq!(chunks, vec![11]);
        assert_eq!(message, b"hello world");
        assert!(region.is_at_rest());
    }

    #[test]
    fn test_chunk_split_sizes() {
        let base = unique_name("writer_split");
        let region = ChannelRegion::open(&base).unwrap();
        let (ready, consumed) = open_chunk_signals(&base);
        let capacity = region.capacity();

        let consumer_base = base.clone();
        let consumer = thread::spawn(move || drain_message(&consumer_base));

        // 10000 bytes: on 4 KiB pages C = 4090, so chunks 4090, 4090, 1820
        let payload: Vec<u8> = (0..10000u32).map(|i| (i % 251) as u8).collect();
        let mut writer = MessageWriter::new(&region, &ready, &consumed);
        writer.write_bytes(&payload).unwrap();
        writer.close().unwrap();

        let (chunks, message) = consumer.join().unwrap();
        let full_chunks = payload.len() / capacity;
        let mut expected: Vec<usize> = vec![capacity; full_chunks];
        expected.push(payload.len() - full_chunks * capacity);
        assert_eq!(chunks, expected);
        assert!(chunks.iter().all(|&len| len <= capacity));
        assert_eq!(message, payload);
    }

    #[test]
    fn test_exact_capacity_is_one_chunk() {
        let base = unique_name("writer_exact");
        let region = ChannelRegion::open(&base).unwrap();
        let (ready, consumed) = open_chunk_signals(&base);
        let capacity = region.capacity();

        let consumer_base = base.clone();
        let consumer = thread::spawn(move || drain_message(&consumer_base));

        let payload = vec![0xABu8; capacity];
        let mut writer = MessageWriter::new(&region, &ready, &consumed);
        writer.write_bytes(&payload).unwrap();
        writer.close().unwrap();

        let (chunks, message) = consumer.join().unwrap();
        assert_eq!(chunks, vec![capacity]);
        assert_eq!(message, payload);
    }

    #[test]
    fn test_zero_length_message_final_handshake() {
        let base = unique_name("writer_empty");
        let region = ChannelRegion::open(&base).unwrap();
        let (ready, consumed) = open_chunk_signals(&base);

        let consumer_base = base.clone();
        let consumer = thread::spawn(move || drain_message(&consumer_base));

        let mut writer = MessageWriter::new(&region, &ready, &consumed);
        writer.close().unwrap();

        let (chunks, message) = consumer.join().unwrap();
        assert_eq!(chunks, vec![0]);
        assert!(message.is_empty());
        assert!(region.is_at_rest());
    }

    #[test]
    fn test_invalid_range_touches_nothing() {
        let base = unique_name("writer_range");
        let region = ChannelRegion::open(&base).unwrap();
        let (ready, consumed) = open_chunk_signals(&base);

        let consumer_base = base.clone();
        let consumer = thread::spawn(move || drain_message(&consumer_base));

        let mut writer = MessageWriter::new(&region, &ready, &consumed);
        let buf = [0u8; 8];

        let err = writer.write_from(&buf, 4, 8).unwrap_err();
        assert!(matches!(err, PipeError::InvalidRange { .. }));

        let err = writer.write_from(&buf, usize::MAX, 2).unwrap_err();
        assert!(matches!(err, PipeError::InvalidRange { .. }));

        // Nothing was published and the writer is still usable
        assert!(region.is_at_rest());
        writer.write_from(&buf, 4, 4).unwrap();
        writer.close().unwrap();

        let (chunks, message) = consumer.join().unwrap();
        assert_eq!(chunks, vec![4]);
        assert_eq!(message, vec![0u8; 4]);
    }

    #[test]
    fn test_write_after_close_fails() {
        let base = unique_name("writer_closed");
        let region = ChannelRegion::open(&base).unwrap();
        let (ready, consumed) = open_chunk_signals(&base);

        let consumer_base = base.clone();
        let consumer = thread::spawn(move || drain_message(&consumer_base));

        let mut writer = MessageWriter::new(&region, &ready, &consumed);
        writer.write_bytes(b"done").unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());

        assert!(matches!(
            writer.write_bytes(b"late"),
            Err(PipeError::WriterClosed)
        ));
        // close is idempotent
        writer.close().unwrap();

        let (_, message) = consumer.join().unwrap();
        assert_eq!(message, b"done");
    }

    #[test]
    fn test_io_write_adapter() {
        use std::io::Write;

        let base = unique_name("writer_io");
        let region = ChannelRegion::open(&base).unwrap();
        let (ready, consumed) = open_chunk_signals(&base);

        let consumer_base = base.clone();
        let consumer = thread::spawn(move || drain_message(&consumer_base));

        let mut writer = MessageWriter::new(&region, &ready, &consumed);
        writer.write_all(b"via io::Write").unwrap();
        writer.flush().unwrap();
        writer.close().unwrap();

        let (_, message) = consumer.join().unwrap();
        assert_eq!(message, b"via io::Write");
    }
}
