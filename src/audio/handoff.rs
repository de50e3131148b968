//! Single-period handoff between the audio callback and the transport thread
//!
//! One buffer of exactly `size` bytes guarded by a mutex, with a `ready`
//! flag and two condition variables:
//!
//! - `filled` is signalled when a producer sets `ready = true`
//! - `emptied` is signalled when a consumer sets `ready = false`, and also
//!   when a consumer arrives (demand), so a waiting producer can proceed
//!
//! Every wait is a predicate wait on `ready`/`closed`, so spurious or
//! doubled wakeups never advance the protocol. A producer can never get
//! more than one period ahead of its consumer.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use thiserror::Error;

/// The handoff was closed; no further periods will be exchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Handoff closed")]
pub struct HandoffClosed;

struct Slot {
    data: Vec<u8>,
    ready: bool,
    closed: bool,
    transfers: u64,
}

/// Shared single-buffer handoff
pub struct Handoff {
    slot: Mutex<Slot>,
    filled: Condvar,
    emptied: Condvar,
    size: usize,
}

impl Handoff {
    pub fn new(size: usize) -> Self {
        Self {
            slot: Mutex::new(Slot {
                data: vec![0u8; size],
                ready: false,
                closed: false,
                transfers: 0,
            }),
            filled: Condvar::new(),
            emptied: Condvar::new(),
            size,
        }
    }

    /// Size of the period buffer in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Producer transition: wait for an empty slot, let `write` fill it,
    /// then mark it ready.
    pub fn fill<F>(&self, write: F) -> Result<(), HandoffClosed>
    where
        F: FnOnce(&mut [u8]),
    {
        let mut slot = self.slot.lock();
        self.emptied.wait_while(&mut slot, |s| s.ready && !s.closed);
        if slot.closed {
            return Err(HandoffClosed);
        }

        write(slot.data.as_mut_slice());
        slot.ready = true;
        self.filled.notify_one();
        Ok(())
    }

    /// Like [`fill`](Self::fill), but also blocks until the consumer has
    /// taken the period, so the caller does not run ahead.
    pub fn fill_and_wait<F>(&self, write: F) -> Result<(), HandoffClosed>
    where
        F: FnOnce(&mut [u8]),
    {
        let mut slot = self.slot.lock();
        self.emptied.wait_while(&mut slot, |s| s.ready && !s.closed);
        if slot.closed {
            return Err(HandoffClosed);
        }

        write(slot.data.as_mut_slice());
        slot.ready = true;
        self.filled.notify_one();

        self.emptied.wait_while(&mut slot, |s| s.ready && !s.closed);
        if slot.ready {
            // Closed before the consumer took it
            return Err(HandoffClosed);
        }
        Ok(())
    }

    /// Consumer transition: announce demand, wait for a ready slot, let
    /// `read` copy it out, then mark it empty.
    pub fn drain<F>(&self, read: F) -> Result<(), HandoffClosed>
    where
        F: FnOnce(&[u8]),
    {
        let mut slot = self.slot.lock();
        self.emptied.notify_one();
        self.filled.wait_while(&mut slot, |s| !s.ready && !s.closed);
        // A period published before close is still delivered
        if !slot.ready {
            return Err(HandoffClosed);
        }

        read(slot.data.as_slice());
        slot.ready = false;
        slot.transfers += 1;
        self.emptied.notify_one();
        Ok(())
    }

    /// Stop the exchange and wake every waiter.
    pub fn close(&self) {
        let mut slot = self.slot.lock();
        slot.closed = true;
        self.filled.notify_all();
        self.emptied.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }

    /// Periods handed from producer to consumer so far
    pub fn transfers(&self) -> u64 {
        self.slot.lock().transfers
    }
}

/// Thread-safe handle to a handoff
pub type SharedHandoff = Arc<Handoff>;

/// Create a new shared handoff of `size` bytes
pub fn create_shared_handoff(size: usize) -> SharedHandoff {
    Arc::new(Handoff::new(size))
}
