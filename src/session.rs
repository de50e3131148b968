//! Session controller
//!
//! Owns every resource of one bridge run: device, stream, handoff buffer
//! and transport. Resources are released on every exit path, buffer first,
//! then transport, then stream.

use cpal::traits::StreamTrait;

use crate::audio::{create_shared_handoff, open_stream, select_device, PeriodCallback, SharedHandoff};
use crate::config::{Direction, Endpoint, SessionConfig};
use crate::constants::RECV_BUFFER_PERIODS;
use crate::error::{AudioError, Error, Result};
use crate::network::{Pump, PumpReport, TcpEndpoint, Transport};

/// Closes the handoff when dropped, so a callback blocked on it returns
/// before the stream that owns the callback is torn down.
struct HandoffRelease(SharedHandoff);

impl Drop for HandoffRelease {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// One capture or playback run
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until the transport closes or fails.
    pub fn run(&self) -> Result<PumpReport> {
        let config = &self.config;
        let size = config.buffer_size_bytes();

        tracing::info!(
            "Starting {} session: {}Hz, {} ch, {}, {} frames/period ({:.1}ms, {} bytes)",
            config.direction.as_str(),
            config.sample_rate,
            config.channels,
            config.format,
            config.frame_count,
            config.period_ms(),
            size
        );

        let device = select_device(config.direction, config.device)?;
        tracing::info!("Using device: {}", device_name(&device));

        let handoff = create_shared_handoff(size);
        let callback = PeriodCallback::new(handoff.clone());
        let callback_stats = callback.stats();
        let (stream, stream_errors) = open_stream(&device, config, callback)?;
        let release = HandoffRelease(handoff.clone());

        let mut transport = open_transport(config.endpoint, size)?;
        tracing::info!("Transport ready: {}", transport.describe());

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        let mut pump = Pump::new(handoff.clone()).with_stream_errors(stream_errors);
        let report = match config.direction {
            Direction::Capture => pump.capture(&mut transport),
            Direction::Playback => pump.playback(&mut transport),
        };

        drop(release);
        drop(transport);
        if let Err(e) = stream.pause() {
            tracing::debug!("Failed to pause stream: {}", e);
        }
        drop(stream);

        if callback_stats.mismatched_slices() > 0 {
            tracing::debug!(
                "{} backend slices differed from the requested period size",
                callback_stats.mismatched_slices()
            );
        }
        tracing::info!(
            "Session finished after {} transport periods, {} handed to the device side",
            report.periods,
            handoff.transfers()
        );

        Ok(report)
    }
}

/// Open the byte stream for a session, blocking until a TCP client
/// connects when listening.
pub fn open_transport(endpoint: Endpoint, buffer_size: usize) -> Result<Transport> {
    match endpoint {
        Endpoint::Stdio => Ok(Transport::stdio()),
        Endpoint::Tcp(addr) => {
            let listener = TcpEndpoint::bind(addr)?;
            tracing::info!("Waiting for a client on {}", listener.local_addr()?);
            let (stream, peer) = listener.accept_one(buffer_size * RECV_BUFFER_PERIODS)?;
            tracing::info!("Client connected from {}", peer);
            Ok(Transport::Tcp(stream))
        }
    }
}

/// MIDI bridging is reserved but not provided.
pub fn run_midi(direction: Direction) -> Result<()> {
    Err(Error::Unsupported(format!(
        "MIDI {} is not implemented",
        direction.as_str()
    )))
}

fn device_name(device: &cpal::Device) -> String {
    use cpal::traits::DeviceTrait;
    device.name().unwrap_or_else(|_| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::HandoffClosed;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::thread;

    #[test]
    fn test_release_closes_handoff() {
        let handoff = create_shared_handoff(8);
        let blocked = {
            let handoff = handoff.clone();
            thread::spawn(move || handoff.drain(|_| {}))
        };

        drop(HandoffRelease(handoff.clone()));
        assert_eq!(blocked.join().unwrap(), Err(HandoffClosed));
    }

    #[test]
    fn test_stdio_endpoint() {
        let transport = open_transport(Endpoint::Stdio, 64).unwrap();
        assert_eq!(transport.describe(), "stdio");
    }

    #[test]
    fn test_tcp_endpoint_binds_configured_port() {
        // Reserve a free port, release it, then ask for exactly that port
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();

        let server = thread::spawn(move || {
            let mut transport = open_transport(Endpoint::Tcp(addr), 16).unwrap();
            let mut buf = [0u8; 4];
            transport.read_exact(&mut buf).unwrap();
            buf
        });

        let mut client = loop {
            match TcpStream::connect(addr) {
                Ok(stream) => break stream,
                Err(_) => thread::sleep(std::time::Duration::from_millis(10)),
            }
        };
        client.write_all(&[1, 2, 3, 4]).unwrap();

        assert_eq!(server.join().unwrap(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_midi_is_unsupported() {
        assert!(matches!(run_midi(Direction::Capture), Err(Error::Unsupported(_))));
    }
}
