//! Low-level POSIX shared memory operations

use crate::error::{PipeError, Result};
use rustix::fd::OwnedFd;
use rustix::fs::ftruncate;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use rustix::shm::{shm_open, shm_unlink, Mode, ShmOFlags};
use std::ffi::CString;
use std::ptr::NonNull;

/// POSIX object names are limited to NAME_MAX, minus the leading slash
pub const MAX_NAME_LEN: usize = 254;

/// Handle to a named shared memory region
///
/// Either endpoint may create the region; whichever side actually created it
/// becomes the owner and unlinks the name when dropped.
pub struct SharedMem {
    #[allow(dead_code)]
    fd: OwnedFd,
    addr: NonNull<u8>,
    size: usize,
    name: String,
    is_owner: bool,
}

// SAFETY: SharedMem can be safely shared between threads
// The mapped region itself is synchronized by the channel handshake
unsafe impl Send for SharedMem {}
unsafe impl Sync for SharedMem {}

impl SharedMem {
    /// Create or attach a shared memory region of the given size
    ///
    /// Tries to create the region exclusively first; if it already exists it
    /// is attached instead, so either side of a channel may start first. The
    /// region is zeroed only when freshly created.
    pub fn open(name: &str, size: usize) -> Result<Self> {
        if name.len() > MAX_NAME_LEN {
            return Err(PipeError::NameTooLong {
                max: MAX_NAME_LEN,
                got: name.len(),
            });
        }

        let full_name = format!("/{}", name);
        let c_name = CString::new(full_name).unwrap();

        let (fd, created) = match shm_open(
            c_name.as_c_str(),
            ShmOFlags::CREATE | ShmOFlags::EXCL | ShmOFlags::RDWR,
            Mode::RUSR | Mode::WUSR | Mode::RGRP | Mode::WGRP,
        ) {
            Ok(fd) => (fd, true),
            Err(rustix::io::Errno::EXIST) => {
                // Already exists, attach to it
                let fd = shm_open(c_name.as_c_str(), ShmOFlags::RDWR, Mode::empty()).map_err(
                    |e| PipeError::ShmOpen {
                        name: name.to_string(),
                        source: e.into(),
                    },
                )?;
                (fd, false)
            }
            Err(e) => {
                return Err(PipeError::ShmCreate {
                    name: name.to_string(),
                    source: e.into(),
                })
            }
        };

        // Both sides agree on the size, so this is a no-op on attach
        ftruncate(&fd, size as u64).map_err(|e| PipeError::Truncate(e.into()))?;

        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &fd,
                0,
            )
            .map_err(|e| PipeError::Mmap(e.into()))?
        };

        let addr = NonNull::new(addr.cast::<u8>()).expect("mmap returned null");

        if created {
            // Fresh region starts in the rest state
            unsafe {
                std::ptr::write_bytes(addr.as_ptr(), 0, size);
            }
        }

        Ok(Self {
            fd,
            addr,
            size,
            name: name.to_string(),
            is_owner: created,
        })
    }

    /// Get raw pointer to shared memory
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut u8 {
        self.addr.as_ptr()
    }

    /// Get size of shared memory region
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the name of shared memory
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if this handle created (and will unlink) the shared memory
    #[inline(always)]
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }
}

impl Drop for SharedMem {
    fn drop(&mut self) {
        // Unmap memory
        unsafe {
            let _ = munmap(self.addr.as_ptr().cast(), self.size);
        }

        // If owner, unlink the shared memory
        if self.is_owner {
            let full_name = format!("/{}", self.name);
            if let Ok(c_name) = CString::new(full_name) {
                let _ = shm_unlink(c_name.as_c_str());
            }
        }
    }
}
