//! Audio device enumeration and selection

use cpal::traits::{DeviceTrait, HostTrait};
use std::fmt;

use crate::config::Direction;
use crate::error::AudioError;

/// One entry of the device listing
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Position in the host's device enumeration
    pub index: usize,
    pub name: String,
    pub is_input: bool,
    pub is_output: bool,
    pub is_default: bool,
}

impl DeviceInfo {
    pub fn device_type(&self) -> &'static str {
        match (self.is_input, self.is_output) {
            (true, true) => "Input/Output",
            (true, false) => "Input",
            (false, true) => "Output",
            _ => "Unknown",
        }
    }
}

/// Listing line: index, name, direction and default marker
impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default_marker = if self.is_default { " [DEFAULT]" } else { "" };
        write!(f, "{}. {} ({}){}", self.index, self.name, self.device_type(), default_marker)
    }
}

/// List all available audio devices, in host enumeration order
pub fn list_devices() -> Result<Vec<DeviceInfo>, AudioError> {
    let host = cpal::default_host();

    let default_input_name = host.default_input_device().and_then(|d| d.name().ok());
    let default_output_name = host.default_output_device().and_then(|d| d.name().ok());

    let devices = host
        .devices()
        .map_err(|e| AudioError::CpalError(e.to_string()))?;

    let infos = devices
        .enumerate()
        .map(|(index, device)| {
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
            let is_default = default_input_name.as_ref() == Some(&name)
                || default_output_name.as_ref() == Some(&name);
            DeviceInfo {
                index,
                is_input: device.default_input_config().is_ok(),
                is_output: device.default_output_config().is_ok(),
                is_default,
                name,
            }
        })
        .collect();

    Ok(infos)
}

/// Pick the device for a session.
///
/// `None` selects the host default for the direction; `Some(index)` picks
/// the entry with that index from [`list_devices`].
pub fn select_device(direction: Direction, index: Option<usize>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();

    match index {
        None => {
            let device = match direction {
                Direction::Capture => host.default_input_device(),
                Direction::Playback => host.default_output_device(),
            };
            device.ok_or_else(|| {
                AudioError::DeviceNotFound(format!("No default {} device", direction.as_str()))
            })
        }
        Some(index) => host
            .devices()
            .map_err(|e| AudioError::CpalError(e.to_string()))?
            .nth(index)
            .ok_or_else(|| AudioError::DeviceNotFound(format!("No device with index {}", index))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_is_indexed_in_order() {
        // Hosts without audio devices return an empty list or an error
        if let Ok(devices) = list_devices() {
            for (position, device) in devices.iter().enumerate() {
                assert_eq!(device.index, position);
            }
        }
    }

    #[test]
    fn test_listing_line_shows_flags() {
        let mut info = DeviceInfo {
            index: 2,
            name: "USB Audio".to_string(),
            is_input: true,
            is_output: true,
            is_default: true,
        };
        assert_eq!(info.to_string(), "2. USB Audio (Input/Output) [DEFAULT]");

        info.is_output = false;
        info.is_default = false;
        assert_eq!(info.to_string(), "2. USB Audio (Input)");

        info.is_input = false;
        assert_eq!(info.device_type(), "Unknown");
    }

    #[test]
    fn test_out_of_range_index_is_not_found() {
        let result = select_device(Direction::Playback, Some(usize::MAX));
        assert!(matches!(
            result,
            Err(AudioError::DeviceNotFound(_)) | Err(AudioError::CpalError(_))
        ));
    }
}
