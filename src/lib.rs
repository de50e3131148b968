//! # Sound Bridge
//!
//! Moves fixed-size PCM periods between an audio device and a raw byte
//! stream (standard input/output or a single TCP client).
//!
//! ## Architecture Overview
//!
//! ```text
//!            PLAYBACK (out)                         CAPTURE (in)
//!
//!  ┌───────────────────────┐               ┌───────────────────────┐
//!  │ Transport (stdin/TCP) │               │    Audio device in    │
//!  └───────────┬───────────┘               └───────────┬───────────┘
//!              │ read_full                             │ cpal callback
//!              ▼                                       ▼
//!  ┌───────────────────────┐               ┌───────────────────────┐
//!  │ Pump (main thread)    │               │ PeriodCallback        │
//!  └───────────┬───────────┘               └───────────┬───────────┘
//!              │ fill_and_wait                         │ fill
//!              ▼                                       ▼
//!  ┌───────────────────────────────────────────────────────────────┐
//!  │         Handoff: one period buffer + ready flag               │
//!  └───────────────────────────────────────────────────────────────┘
//!              │ drain                                 │ drain
//!              ▼                                       ▼
//!  ┌───────────────────────┐               ┌───────────────────────┐
//!  │ PeriodCallback        │               │ Pump (main thread)    │
//!  └───────────┬───────────┘               └───────────┬───────────┘
//!              │ cpal callback                         │ write_full
//!              ▼                                       ▼
//!  ┌───────────────────────┐               ┌───────────────────────┐
//!  │   Audio device out    │               │ Transport (stdout/TCP)│
//!  └───────────────────────┘               └───────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod format;
pub mod network;
pub mod session;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate for audio processing
    pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

    /// Default channel count (mono)
    pub const DEFAULT_CHANNELS: u16 = 1;

    /// Periods per second when no frame count is given (20 ms periods)
    pub const DEFAULT_PERIODS_PER_SECOND: u32 = 50;

    /// Socket receive buffer, in periods
    pub const RECV_BUFFER_PERIODS: usize = 4;

    /// Capacity of the backend error channel
    pub const STREAM_ERROR_CAPACITY: usize = 16;

    /// How often the pump logs progress, in periods
    pub const STATS_INTERVAL_PERIODS: u64 = 250;
}
