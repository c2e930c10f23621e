//! Audio device enumeration and selection

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use crate::{AudioError, AudioResult};

/// Audio output device information
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub output_channels: u16,
    pub default_sample_rate: u32,
}

/// Get the audio host (platform-specific backend)
pub fn get_host() -> Host {
    #[cfg(target_os = "linux")]
    {
        // Prefer JACK when it is running (only when built with the jack backend)
        #[cfg(feature = "jack")]
        {
            if let Some(id) = cpal::available_hosts()
                .into_iter()
                .find(|h| *h == cpal::HostId::Jack)
            {
                if let Ok(host) = cpal::host_from_id(id) {
                    return host;
                }
            }
        }
        cpal::default_host()
    }

    #[cfg(not(target_os = "linux"))]
    {
        cpal::default_host()
    }
}

/// List available output devices with their capabilities.
pub fn list_output_devices() -> AudioResult<Vec<DeviceInfo>> {
    let host = get_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host
        .output_devices()
        .map_err(|e| AudioError::BackendError(e.to_string()))?
    {
        let Ok(name) = device.name() else { continue };
        let Ok(config) = device.default_output_config() else {
            continue;
        };

        devices.push(DeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            output_channels: config.channels(),
            default_sample_rate: config.sample_rate(),
            name,
        });
    }

    Ok(devices)
}

/// Resolve the configured output device.
///
/// A named device is matched exactly among output devices; a missing name or
/// no match falls back to the system default (logged, not fatal).
pub fn select_output_device(name: Option<&str>) -> AudioResult<Device> {
    let host = get_host();

    if let Some(wanted) = name {
        let devices = host
            .output_devices()
            .map_err(|e| AudioError::BackendError(e.to_string()))?;
        for device in devices {
            if device.name().map(|n| n == wanted).unwrap_or(false) {
                log::info!("Using output device: {wanted}");
                return Ok(device);
            }
        }
        log::warn!("Device '{wanted}' not found, using system default");
    }

    let device = host
        .default_output_device()
        .ok_or(AudioError::NoDevice)?;
    if let Ok(n) = device.name() {
        log::info!("Using default output device: {n}");
    }
    Ok(device)
}

/// Maximum output channel count a device advertises.
pub fn max_output_channels(device: &Device) -> AudioResult<u16> {
    let configs = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?;

    let max = configs.map(|c| c.channels()).max().unwrap_or(0);
    if max == 0 {
        return Err(AudioError::ConfigError(
            "device reports no output channels".to_string(),
        ));
    }
    Ok(max)
}
