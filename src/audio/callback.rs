//! Per-period audio callback
//!
//! Runs on the backend's real-time thread. It only touches the handoff and
//! its own staging buffer: no transport I/O, no logging, no allocation
//! after construction.
//!
//! The backend is asked for slices of exactly one period, but may deliver
//! other sizes. Slices are re-chunked through the staging buffer so the
//! handoff always carries whole, contiguous periods.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::handoff::SharedHandoff;

/// Counters shared between the callback and the session
#[derive(Clone, Default)]
pub struct CallbackStats {
    /// Backend slices whose size differed from one period
    mismatched: Arc<AtomicU64>,
    /// Slices serviced after the handoff was closed
    skipped: Arc<AtomicU64>,
}

impl CallbackStats {
    pub fn mismatched_slices(&self) -> u64 {
        self.mismatched.load(Ordering::Relaxed)
    }

    pub fn skipped_slices(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

/// Exchanges backend slices with the handoff buffer, one period at a time
pub struct PeriodCallback {
    handoff: SharedHandoff,
    /// One period, staged between the backend and the handoff
    staging: Vec<u8>,
    /// Playback: bytes of `staging` already written to the backend
    served: usize,
    /// Capture: bytes of `staging` already taken from the backend
    filled: usize,
    stats: CallbackStats,
}

impl PeriodCallback {
    pub fn new(handoff: SharedHandoff) -> Self {
        let size = handoff.size();
        Self {
            handoff,
            staging: vec![0u8; size],
            // Playback starts with nothing staged
            served: size,
            filled: 0,
            stats: CallbackStats::default(),
        }
    }

    pub fn handoff(&self) -> &SharedHandoff {
        &self.handoff
    }

    pub fn stats(&self) -> CallbackStats {
        self.stats.clone()
    }

    /// Fill the backend's output slice from the current period, draining
    /// the next period from the handoff whenever the current one runs out.
    ///
    /// Once the handoff is closed the rest of the slice is silenced.
    pub fn playback(&mut self, out: &mut [u8]) {
        self.note_size(out.len());
        let size = self.staging.len();
        if size == 0 {
            out.fill(0);
            return;
        }

        let mut written = 0;
        while written < out.len() {
            if self.served == size {
                let staging = &mut self.staging;
                if self.handoff.drain(|data| staging.copy_from_slice(data)).is_err() {
                    out[written..].fill(0);
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                self.served = 0;
            }

            let n = (size - self.served).min(out.len() - written);
            out[written..written + n].copy_from_slice(&self.staging[self.served..self.served + n]);
            self.served += n;
            written += n;
        }
    }

    /// Accumulate the backend's captured slice and hand each completed
    /// period to the transport thread.
    pub fn capture(&mut self, input: &[u8]) {
        self.note_size(input.len());
        let size = self.staging.len();
        if size == 0 {
            return;
        }

        let mut read = 0;
        while read < input.len() {
            let n = (size - self.filled).min(input.len() - read);
            self.staging[self.filled..self.filled + n].copy_from_slice(&input[read..read + n]);
            self.filled += n;
            read += n;

            if self.filled == size {
                let staging = &self.staging;
                if self.handoff.fill(|data| data.copy_from_slice(staging)).is_err() {
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                    self.filled = 0;
                    return;
                }
                self.filled = 0;
            }
        }
    }

    fn note_size(&self, len: usize) {
        if len != self.staging.len() {
            self.stats.mismatched.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::handoff::create_shared_handoff;
    use std::thread;

    fn drain_period(handoff: &SharedHandoff) -> Vec<u8> {
        let mut got = Vec::new();
        handoff.drain(|buf| got.extend_from_slice(buf)).unwrap();
        got
    }

    #[test]
    fn test_playback_copies_period() {
        let handoff = create_shared_handoff(6);
        let mut callback = PeriodCallback::new(handoff.clone());

        let producer = {
            let handoff = handoff.clone();
            thread::spawn(move || handoff.fill_and_wait(|buf| buf.copy_from_slice(&[1, 2, 3, 4, 5, 6])))
        };

        let mut out = [0xAAu8; 6];
        callback.playback(&mut out);
        producer.join().unwrap().unwrap();

        assert_eq!(out, [1, 2, 3, 4, 5, 6]);
        assert_eq!(callback.stats().mismatched_slices(), 0);
    }

    #[test]
    fn test_playback_splits_period_across_short_slices() {
        let handoff = create_shared_handoff(8);
        let mut callback = PeriodCallback::new(handoff.clone());
        handoff.fill(|buf| buf.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8])).unwrap();

        let mut first = [0u8; 4];
        let mut second = [0u8; 4];
        callback.playback(&mut first);
        callback.playback(&mut second);

        assert_eq!(first, [1, 2, 3, 4]);
        assert_eq!(second, [5, 6, 7, 8]);
        assert_eq!(handoff.transfers(), 1);
        assert_eq!(callback.stats().mismatched_slices(), 2);
    }

    #[test]
    fn test_playback_spans_periods_with_long_slice() {
        let handoff = create_shared_handoff(4);
        let mut callback = PeriodCallback::new(handoff.clone());

        let producer = {
            let handoff = handoff.clone();
            thread::spawn(move || {
                handoff.fill(|buf| buf.copy_from_slice(&[1, 2, 3, 4])).unwrap();
                handoff.fill(|buf| buf.copy_from_slice(&[5, 6, 7, 8])).unwrap();
            })
        };

        let mut out = [0u8; 6];
        callback.playback(&mut out);
        assert_eq!(out, [1, 2, 3, 4, 5, 6]);

        let mut rest = [0u8; 2];
        callback.playback(&mut rest);
        assert_eq!(rest, [7, 8]);

        producer.join().unwrap();
        assert_eq!(handoff.transfers(), 2);
    }

    #[test]
    fn test_playback_after_close_is_silent() {
        let handoff = create_shared_handoff(4);
        let mut callback = PeriodCallback::new(handoff.clone());
        handoff.close();

        let mut out = [0x55u8; 4];
        callback.playback(&mut out);

        assert_eq!(out, [0; 4]);
        assert_eq!(callback.stats().skipped_slices(), 1);
    }

    #[test]
    fn test_capture_hands_period_to_consumer() {
        let handoff = create_shared_handoff(4);
        let mut callback = PeriodCallback::new(handoff.clone());

        callback.capture(&[4, 3, 2, 1]);

        assert_eq!(drain_period(&handoff), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_capture_joins_short_slices_into_one_period() {
        let handoff = create_shared_handoff(8);
        let mut callback = PeriodCallback::new(handoff.clone());

        callback.capture(&[1, 2, 3, 4]);
        assert_eq!(handoff.transfers(), 0);
        callback.capture(&[5, 6, 7, 8]);

        assert_eq!(drain_period(&handoff), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(callback.stats().mismatched_slices(), 2);
    }

    #[test]
    fn test_capture_splits_long_slice_across_periods() {
        let handoff = create_shared_handoff(4);
        let mut callback = PeriodCallback::new(handoff.clone());

        let consumer = {
            let handoff = handoff.clone();
            thread::spawn(move || vec![drain_period(&handoff), drain_period(&handoff)])
        };

        callback.capture(&[1, 2, 3, 4, 5, 6]);
        callback.capture(&[7, 8]);

        assert_eq!(consumer.join().unwrap(), vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
    }

    #[test]
    fn test_capture_after_close_discards() {
        let handoff = create_shared_handoff(4);
        let mut callback = PeriodCallback::new(handoff.clone());
        handoff.close();

        callback.capture(&[1, 1, 1, 1]);
        assert_eq!(callback.stats().skipped_slices(), 1);
        assert_eq!(handoff.transfers(), 0);
    }
}
