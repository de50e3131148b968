//! Transport loop: moves one period per iteration between the transport
//! and the handoff buffer.
//!
//! Whatever ends the loop, the handoff is closed on the way out so the
//! audio callback is never left waiting for a period that will not come.

use crossbeam_channel::Receiver;
use std::io::{self, Read, Write};

use crate::audio::handoff::SharedHandoff;
use crate::constants::STATS_INTERVAL_PERIODS;
use crate::error::{AudioError, TransportError};
use crate::network::transport::{read_full, write_full};

/// Why the loop stopped
#[derive(Debug)]
pub enum PumpEnd {
    /// The peer closed the stream
    Eof,
    /// Transport read or write failed
    Failed(io::Error),
    /// The handoff was closed from the audio side
    HandoffClosed,
}

/// Outcome of a finished loop
#[derive(Debug)]
pub struct PumpReport {
    /// Complete periods moved through the transport
    pub periods: u64,
    pub end: PumpEnd,
}

impl PumpReport {
    pub fn is_clean(&self) -> bool {
        !matches!(self.end, PumpEnd::Failed(_))
    }
}

impl From<TransportError> for PumpEnd {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Closed => PumpEnd::Eof,
            TransportError::Io(e) => PumpEnd::Failed(e),
            other => PumpEnd::Failed(io::Error::new(io::ErrorKind::Other, other.to_string())),
        }
    }
}

/// Transport side of the handoff
pub struct Pump {
    handoff: SharedHandoff,
    /// Period-sized scratch so transport I/O happens outside the lock
    scratch: Vec<u8>,
    stream_errors: Option<Receiver<AudioError>>,
}

impl Pump {
    pub fn new(handoff: SharedHandoff) -> Self {
        let scratch = vec![0u8; handoff.size()];
        Self {
            handoff,
            scratch,
            stream_errors: None,
        }
    }

    /// Log backend errors between periods
    pub fn with_stream_errors(mut self, errors: Receiver<AudioError>) -> Self {
        self.stream_errors = Some(errors);
        self
    }

    /// Transport to audio: read a full period, publish it, and wait until
    /// the callback has taken it before reading the next one.
    pub fn playback<R: Read + ?Sized>(&mut self, reader: &mut R) -> PumpReport {
        let mut periods = 0u64;
        loop {
            if let Err(e) = read_full(reader, &mut self.scratch) {
                return self.finish(periods, e.into());
            }

            let scratch = &self.scratch;
            if self.handoff.fill_and_wait(|data| data.copy_from_slice(scratch)).is_err() {
                return self.finish(periods, PumpEnd::HandoffClosed);
            }

            periods += 1;
            self.between_periods(periods);
        }
    }

    /// Audio to transport: wait for the callback's period, take it, and
    /// write it out in full.
    pub fn capture<W: Write + ?Sized>(&mut self, writer: &mut W) -> PumpReport {
        let mut periods = 0u64;
        loop {
            let scratch = &mut self.scratch;
            if self.handoff.drain(|data| scratch.copy_from_slice(data)).is_err() {
                return self.finish(periods, PumpEnd::HandoffClosed);
            }

            if let Err(e) = write_full(writer, &self.scratch) {
                return self.finish(periods, e.into());
            }

            periods += 1;
            self.between_periods(periods);
        }
    }

    fn log_stream_errors(&self) {
        if let Some(errors) = &self.stream_errors {
            for err in errors.try_iter() {
                tracing::warn!("Audio stream reported: {}", err);
            }
        }
    }

    fn between_periods(&self, periods: u64) {
        self.log_stream_errors();

        if periods % STATS_INTERVAL_PERIODS == 0 {
            tracing::debug!(
                "{} periods, {} bytes moved",
                periods,
                periods * self.scratch.len() as u64
            );
        }
    }

    fn finish(&self, periods: u64, end: PumpEnd) -> PumpReport {
        self.handoff.close();
        self.log_stream_errors();
        match &end {
            PumpEnd::Eof => tracing::info!("Transport closed after {} periods", periods),
            PumpEnd::Failed(e) => tracing::error!("Transport failed after {} periods: {}", periods, e),
            PumpEnd::HandoffClosed => tracing::info!("Audio side closed after {} periods", periods),
        }
        PumpReport { periods, end }
    }
}
