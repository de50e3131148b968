//! Backend stream construction
//!
//! Streams are built with the raw byte API so the callback moves
//! `buffer_size_bytes` untouched, whatever the sample format.

use cpal::traits::DeviceTrait;
use cpal::{BufferSize, SampleRate, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::audio::callback::PeriodCallback;
use crate::audio::handoff::Handoff;
use crate::config::{Direction, SessionConfig};
use crate::constants::STREAM_ERROR_CAPACITY;
use crate::error::AudioError;

/// Stream configuration for a session: fixed period of `frame_count` frames
pub fn stream_config(config: &SessionConfig) -> StreamConfig {
    StreamConfig {
        channels: config.channels,
        sample_rate: SampleRate(config.sample_rate),
        buffer_size: BufferSize::Fixed(config.frame_count),
    }
}

/// Build (but do not start) the stream for a session.
///
/// Backend errors raised while running are forwarded on the returned
/// channel; a full channel drops them.
pub fn open_stream(
    device: &cpal::Device,
    config: &SessionConfig,
    mut callback: PeriodCallback,
) -> Result<(cpal::Stream, Receiver<AudioError>), AudioError> {
    let sample_format = config.format.to_cpal().ok_or_else(|| {
        AudioError::UnsupportedFormat(format!("{} is not supported by the audio backend", config.format))
    })?;
    let stream_config = stream_config(config);
    let (error_tx, error_rx) = bounded::<AudioError>(STREAM_ERROR_CAPACITY);

    let handoff = callback.handoff().clone();
    let on_error = move |err: cpal::StreamError| report_stream_error(err, &handoff, &error_tx);

    let stream = match config.direction {
        Direction::Capture => device.build_input_stream_raw(
            &stream_config,
            sample_format,
            move |data: &cpal::Data, _: &cpal::InputCallbackInfo| {
                callback.capture(data.bytes());
            },
            on_error,
            None,
        ),
        Direction::Playback => device.build_output_stream_raw(
            &stream_config,
            sample_format,
            move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                callback.playback(data.bytes_mut());
            },
            on_error,
            None,
        ),
    }
    .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok((stream, error_rx))
}

/// Forward a backend error. A lost device will never run the callback
/// again, so the handoff is closed to release the transport thread.
pub(crate) fn report_stream_error(err: cpal::StreamError, handoff: &Handoff, errors: &Sender<AudioError>) {
    let report = match err {
        cpal::StreamError::DeviceNotAvailable => {
            handoff.close();
            AudioError::DeviceNotFound("device is no longer available".to_string())
        }
        other => AudioError::StreamError(other.to_string()),
    };
    let _ = errors.try_send(report);
}
