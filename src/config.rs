//! Configuration types
//!
//! Values come from three layers: built-in defaults, an optional TOML file,
//! and command line overrides (highest precedence).

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};
use crate::format::SampleFormat;

/// Session direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Audio in, transport out
    Capture,
    /// Transport in, audio out
    Playback,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Capture => "capture",
            Direction::Playback => "playback",
        }
    }
}

/// File-level defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Device index as printed by `list`
    pub device: Option<usize>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames per period; `None` means a 20 ms period
    pub frames: Option<u32>,
    pub format: String,
    /// TCP port; 0 selects standard input/output
    pub port: u16,
    pub bind_address: IpAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            frames: None,
            format: SampleFormat::default().name().to_string(),
            port: 0,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl AppConfig {
    /// Default config file location for this platform
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "sound-bridge")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from an explicit path, or from the platform location when a
    /// file exists there, or fall back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Command line values that override the file config
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub device: Option<usize>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
    pub frames: Option<u32>,
    pub format: Option<String>,
    pub port: Option<u16>,
    pub bind_address: Option<IpAddr>,
}

/// Where the PCM byte stream comes from or goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Standard input (playback) or standard output (capture)
    Stdio,
    /// Listen on this address and accept exactly one client
    Tcp(SocketAddr),
}

/// Fully resolved parameters for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub direction: Direction,
    pub device: Option<usize>,
    pub channels: u16,
    pub sample_rate: u32,
    pub frame_count: u32,
    pub format: SampleFormat,
    pub endpoint: Endpoint,
}

impl SessionConfig {
    /// Merge overrides over the file config and validate the result.
    pub fn resolve(direction: Direction, file: &AppConfig, overrides: &Overrides) -> Result<Self> {
        let sample_rate = overrides.sample_rate.unwrap_or(file.sample_rate);
        let channels = overrides.channels.unwrap_or(file.channels);
        let format = SampleFormat::parse_or_default(
            overrides.format.as_deref().unwrap_or(&file.format),
        );

        if sample_rate == 0 {
            return Err(Error::Config("sample rate must be positive".into()));
        }
        if channels == 0 {
            return Err(Error::Config("channel count must be at least 1".into()));
        }

        let frame_count = match overrides.frames.or(file.frames) {
            Some(0) | None => default_frame_count(sample_rate),
            Some(frames) => frames,
        };
        if frame_count == 0 {
            return Err(Error::Config(format!(
                "sample rate {} is too low for a 20 ms period",
                sample_rate
            )));
        }

        let port = overrides.port.unwrap_or(file.port);
        let endpoint = if port == 0 {
            Endpoint::Stdio
        } else {
            let ip = overrides.bind_address.unwrap_or(file.bind_address);
            Endpoint::Tcp(SocketAddr::new(ip, port))
        };

        Ok(Self {
            direction,
            device: overrides.device.or(file.device),
            channels,
            sample_rate,
            frame_count,
            format,
            endpoint,
        })
    }

    /// Bytes exchanged per period
    pub fn buffer_size_bytes(&self) -> usize {
        buffer_size_bytes(self.frame_count, self.channels, self.format)
    }

    /// Period length in milliseconds
    pub fn period_ms(&self) -> f64 {
        self.frame_count as f64 * 1000.0 / self.sample_rate as f64
    }
}

/// Frames in one 20 ms period
pub fn default_frame_count(sample_rate: u32) -> u32 {
    sample_rate / DEFAULT_PERIODS_PER_SECOND
}

pub fn buffer_size_bytes(frame_count: u32, channels: u16, format: SampleFormat) -> usize {
    frame_count as usize * channels as usize * format.bytes_per_sample()
}
