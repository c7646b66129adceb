//! Named cross-process rendezvous signals
//!
//! A `Signal` is a binary rendezvous point between two processes: one side
//! calls `raise()`, the other blocks in `wait_and_clear()` until the raise
//! arrives, consuming it. Backed by POSIX named semaphores, but the naming
//! convention is the wire contract, not the primitive.

use crate::error::{PipeError, Result};
use crate::shm::MAX_NAME_LEN;
use std::ffi::CString;
use std::io;

/// Signal name suffixes, fixed by the channel wire contract
pub const SENDING_STARTED_SUFFIX: &str = "_MessageSending";
pub const MESSAGE_CONSUMED_SUFFIX: &str = "_MessageRead";
pub const CHUNK_READY_SUFFIX: &str = "_BytesWritten";
pub const CHUNK_CONSUMED_SUFFIX: &str = "_BytesRead";

/// A named binary rendezvous signal
///
/// `raise()` wakes exactly one waiter; `wait_and_clear()` blocks until raised
/// and auto-resets. A raise with no waiter stays pending until the next wait.
pub struct Signal {
    sem: *mut libc::sem_t,
    name: String,
    is_owner: bool,
}

// SAFETY: the semaphore is a process-shared kernel object; sem_post and
// sem_wait are safe to call concurrently from any thread
unsafe impl Send for Signal {}
unsafe impl Sync for Signal {}

impl Signal {
    /// Create or attach a named signal, initially not raised
    ///
    /// Whichever side actually created the semaphore unlinks it on drop,
    /// mirroring the shared memory lifecycle.
    pub fn open(name: &str) -> Result<Self> {
        if name.len() > MAX_NAME_LEN {
            return Err(PipeError::NameTooLong {
                max: MAX_NAME_LEN,
                got: name.len(),
            });
        }

        let full_name = format!("/{}", name);
        let c_name = CString::new(full_name).unwrap();

        let mode =
            (libc::S_IRUSR | libc::S_IWUSR | libc::S_IRGRP | libc::S_IWGRP) as libc::c_uint;

        // Try to create exclusively first, fall back to open if exists
        let (sem, created) = unsafe {
            let sem = libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                mode,
                0 as libc::c_uint,
            );
            if sem != libc::SEM_FAILED {
                (sem, true)
            } else {
                let err = io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::EEXIST) {
                    return Err(PipeError::SignalCreate {
                        name: name.to_string(),
                        source: err,
                    });
                }
                let sem = libc::sem_open(c_name.as_ptr(), 0);
                if sem == libc::SEM_FAILED {
                    return Err(PipeError::SignalCreate {
                        name: name.to_string(),
                        source: io::Error::last_os_error(),
                    });
                }
                (sem, false)
            }
        };

        Ok(Self {
            sem,
            name: name.to_string(),
            is_owner: created,
        })
    }

    /// Raise the signal, waking one waiter
    pub fn raise(&self) -> Result<()> {
        let rc = unsafe { libc::sem_post(self.sem) };
        if rc != 0 {
            return Err(PipeError::Signal {
                name: self.name.clone(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    /// Block until the signal is raised, then clear it
    pub fn wait_and_clear(&self) -> Result<()> {
        loop {
            let rc = unsafe { libc::sem_wait(self.sem) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(PipeError::Signal {
                name: self.name.clone(),
                source: err,
            });
        }
    }

    /// Get the name of the signal
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Signal {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::sem_close(self.sem);
        }
        if self.is_owner {
            let full_name = format!("/{}", self.name);
            if let Ok(c_name) = CString::new(full_name) {
                unsafe {
                    let _ = libc::sem_unlink(c_name.as_ptr());
                }
            }
        }
    }
}

/// The four signals of one channel, derived from its base name
pub struct SignalSet {
    /// Sender -> receiver: a message send has started
    pub sending_started: Signal,
    /// Receiver -> sender: the whole message was consumed
    pub message_consumed: Signal,
    /// Sender -> receiver: a chunk is published in the payload buffer
    pub chunk_ready: Signal,
    /// Receiver -> sender: the published chunk was consumed
    pub chunk_consumed: Signal,
}

impl SignalSet {
    /// Create or attach all four signals for the named channel
    pub fn open(base: &str) -> Result<Self> {
        Ok(Self {
            sending_started: Signal::open(&format!("{}{}", base, SENDING_STARTED_SUFFIX))?,
            message_consumed: Signal::open(&format!("{}{}", base, MESSAGE_CONSUMED_SUFFIX))?,
            chunk_ready: Signal::open(&format!("{}{}", base, CHUNK_READY_SUFFIX))?,
            chunk_consumed: Signal::open(&format!("{}{}", base, CHUNK_CONSUMED_SUFFIX))?,
        })
    }
}
