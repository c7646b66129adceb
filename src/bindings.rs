//! C Bindings for PagePipe
//!
//! Provides a raw C API for opening channels and moving whole messages.

use crate::channel::{ReceiverChannel, SenderChannel};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;
use std::slice;

// Opaque handles
pub struct PagePipeSenderHandle(SenderChannel);
pub struct PagePipeReceiverHandle(ReceiverChannel);

/// Open the send side of a channel
///
/// # Safety
/// name must be a valid null-terminated string
#[no_mangle]
pub unsafe extern "C" fn pagepipe_sender_open(name: *const c_char) -> *mut PagePipeSenderHandle {
    if name.is_null() {
        return ptr::null_mut();
    }

    let c_str = CStr::from_ptr(name);
    let str_slice = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    match SenderChannel::open(str_slice) {
        Ok(sender) => Box::into_raw(Box::new(PagePipeSenderHandle(sender))),
        Err(_) => ptr::null_mut(),
    }
}

/// Destroy a sender handle, releasing the channel resources
#[no_mangle]
pub unsafe extern "C" fn pagepipe_sender_destroy(handle: *mut PagePipeSenderHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Send one message from a buffer, blocking until the receiver consumes it
///
/// Returns true on success.
#[no_mangle]
pub unsafe extern "C" fn pagepipe_sender_send(
    handle: *mut PagePipeSenderHandle,
    data: *const u8,
    len: usize,
) -> bool {
    if handle.is_null() || (data.is_null() && len > 0) {
        return false;
    }
    let sender = &mut (*handle).0;
    let body: &[u8] = if len == 0 {
        &[]
    } else {
        slice::from_raw_parts(data, len)
    };
    sender.send_message(|w| w.write_bytes(body)).is_ok()
}

/// Per-chunk payload capacity of the channel
#[no_mangle]
pub unsafe extern "C" fn pagepipe_sender_capacity(handle: *mut PagePipeSenderHandle) -> usize {
    let sender = &(*handle).0;
    sender.capacity()
}

// --- Receiver Side ---

/// Open the receive side of a channel
///
/// # Safety
/// name must be a valid null-terminated string
#[no_mangle]
pub unsafe extern "C" fn pagepipe_receiver_open(
    name: *const c_char,
) -> *mut PagePipeReceiverHandle {
    if name.is_null() {
        return ptr::null_mut();
    }

    let c_str = CStr::from_ptr(name);
    let str_slice = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    match ReceiverChannel::open(str_slice) {
        Ok(receiver) => Box::into_raw(Box::new(PagePipeReceiverHandle(receiver))),
        Err(_) => ptr::null_mut(),
    }
}

/// Destroy a receiver handle, releasing the channel resources
#[no_mangle]
pub unsafe extern "C" fn pagepipe_receiver_destroy(handle: *mut PagePipeReceiverHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Receive one message, blocking until the sender delivers it
///
/// Copies up to max_len bytes into buf and returns the full message length
/// (which may be larger than the buffer). Returns usize::MAX on error.
#[no_mangle]
pub unsafe extern "C" fn pagepipe_receiver_recv(
    handle: *mut PagePipeReceiverHandle,
    buf: *mut u8,
    max_len: usize,
) -> usize {
    if handle.is_null() {
        return usize::MAX;
    }
    let receiver = &mut (*handle).0;
    match receiver.receive_message() {
        Ok(message) => {
            let copy_len = message.len().min(max_len);
            if copy_len > 0 && !buf.is_null() {
                ptr::copy_nonoverlapping(message.as_ptr(), buf, copy_len);
            }
            message.len()
        }
        Err(_) => usize::MAX,
    }
}
