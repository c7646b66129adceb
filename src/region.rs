//! Channel region layout
//!
//! The shared region backing one channel is exactly one host page:
//!
//! ```text
//! offset 0   bytes_in_chunk    u32, host-native
//! offset 4   message_complete  u8 (0 or 1)
//! offset 5   reserved          1 byte, unused by the protocol
//! offset 6.. payload           capacity C = page size - 6
//! ```
//!
//! Header fields are written by exactly one side during its protocol phase;
//! the chunk handshake is the only synchronization.

use crate::error::Result;
use crate::shm::SharedMem;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Offset of the `bytes_in_chunk` header field
pub const BYTES_IN_CHUNK_OFFSET: usize = 0;
/// Offset of the `message_complete` header field
pub const MESSAGE_COMPLETE_OFFSET: usize = 4;
/// Offset of the reserved byte (kept for a future header flag)
pub const RESERVED_OFFSET: usize = 5;
/// Offset of the payload buffer
pub const PAYLOAD_OFFSET: usize = 6;

/// The fixed-layout shared region of one channel
pub struct ChannelRegion {
    shm: SharedMem,
}

impl ChannelRegion {
    /// Create or attach the region for the named channel, sized to one page
    pub fn open(name: &str) -> Result<Self> {
        let shm = SharedMem::open(name, rustix::param::page_size())?;
        Ok(Self { shm })
    }

    /// Payload capacity C
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.shm.size() - PAYLOAD_OFFSET
    }

    /// Get the name of the backing region
    #[inline(always)]
    pub fn name(&self) -> &str {
        self.shm.name()
    }

    // The base pointer is page-aligned, so the u32 at offset 0 is aligned
    #[inline(always)]
    fn bytes_in_chunk_cell(&self) -> &AtomicU32 {
        unsafe { &*(self.shm.as_ptr().add(BYTES_IN_CHUNK_OFFSET) as *const AtomicU32) }
    }

    #[inline(always)]
    fn message_complete_cell(&self) -> &AtomicU8 {
        unsafe { &*(self.shm.as_ptr().add(MESSAGE_COMPLETE_OFFSET) as *const AtomicU8) }
    }

    /// Read the published size of the current chunk
    #[inline]
    pub fn bytes_in_chunk(&self) -> u32 {
        self.bytes_in_chunk_cell().load(Ordering::Acquire)
    }

    /// Publish the size of the current chunk
    #[inline]
    pub fn set_bytes_in_chunk(&self, n: u32) {
        self.bytes_in_chunk_cell().store(n, Ordering::Release);
    }

    /// Read the message-complete flag
    #[inline]
    pub fn message_complete(&self) -> bool {
        self.message_complete_cell().load(Ordering::Acquire) != 0
    }

    /// Set the message-complete flag
    #[inline]
    pub fn set_message_complete(&self, complete: bool) {
        self.message_complete_cell()
            .store(complete as u8, Ordering::Release);
    }

    /// Copy bytes into the payload buffer at the given offset
    #[inline]
    pub fn write_payload(&self, offset: usize, src: &[u8]) {
        debug_assert!(offset + src.len() <= self.capacity());
        unsafe {
            std::ptr::copy_nonoverlapping(
                src.as_ptr(),
                self.shm.as_ptr().add(PAYLOAD_OFFSET + offset),
                src.len(),
            );
        }
    }

    /// Copy bytes out of the payload buffer at the given offset
    #[inline]
    pub fn read_payload(&self, offset: usize, dst: &mut [u8]) {
        debug_assert!(offset + dst.len() <= self.capacity());
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.shm.as_ptr().add(PAYLOAD_OFFSET + offset),
                dst.as_mut_ptr(),
                dst.len(),
            );
        }
    }

    /// Return the header to the rest state
    #[inline]
    pub fn reset(&self) {
        self.set_bytes_in_chunk(0);
        self.set_message_complete(false);
    }

    /// Check whether the header is in the rest state
    #[inline]
    pub fn is_at_rest(&self) -> bool {
        self.bytes_in_chunk() == 0 && !self.message_complete()
    }
}
