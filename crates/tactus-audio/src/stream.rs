//! Output stream management
//!
//! Wraps a cpal output stream around the engine's render function. When the
//! device only offers more channels than the engine produces, the extra
//! columns are zero-filled per frame.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize as CpalBufferSize, Device, SampleFormat, Stream, StreamConfig,
    SupportedStreamConfig,
};

use tactus_core::Sample;

use crate::{AudioConfig, AudioError, AudioResult};

/// Called once per device buffer with the interleaved output to fill.
pub type RenderFn = Box<dyn FnMut(&mut [Sample]) + Send + 'static>;

/// Invoked when the device reports a stream error.
pub type ErrorHook = Box<dyn Fn() + Send + 'static>;

/// Audio output stream wrapper
pub struct OutputStream {
    stream: Stream,
    config: AudioConfig,
    device_channels: u16,
}

impl OutputStream {
    /// Build an f32 output stream for the given configuration.
    pub fn open(
        device: &Device,
        config: AudioConfig,
        render: RenderFn,
        on_error: ErrorHook,
    ) -> AudioResult<Self> {
        let supported = get_output_stream_config(device, &config)?;
        let device_channels = supported.channels();

        let stream = build_output_stream(
            device,
            &supported,
            &config,
            render,
            on_error,
        )?;

        log::info!(
            "Output stream ready: {}Hz, {} device channel(s), {} frame buffers",
            config.sample_rate,
            device_channels,
            config.buffer_frames
        );

        Ok(Self {
            stream,
            config,
            device_channels,
        })
    }

    pub fn start(&self) -> AudioResult<()> {
        self.stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))
    }

    pub fn stop(&self) -> AudioResult<()> {
        self.stream
            .pause()
            .map_err(|e| AudioError::StreamError(e.to_string()))
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn device_channels(&self) -> u16 {
        self.device_channels
    }
}

fn get_output_stream_config(
    device: &Device,
    config: &AudioConfig,
) -> AudioResult<SupportedStreamConfig> {
    let sample_rate = config.sample_rate;

    let candidates: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| {
            c.channels() >= config.channels
                && c.min_sample_rate() <= sample_rate
                && c.max_sample_rate() >= sample_rate
                && c.sample_format() == SampleFormat::F32
        })
        .collect();

    // Prefer the exact channel count over wider layouts
    let best = candidates
        .iter()
        .find(|c| c.channels() == config.channels)
        .or_else(|| candidates.first());

    match best {
        Some(range) => Ok(range.with_sample_rate(sample_rate)),
        None => Err(AudioError::ConfigError(format!(
            "No matching output config for {} channels @ {}Hz",
            config.channels, config.sample_rate
        ))),
    }
}

fn build_output_stream(
    device: &Device,
    supported: &SupportedStreamConfig,
    config: &AudioConfig,
    mut render: RenderFn,
    on_error: ErrorHook,
) -> AudioResult<Stream> {
    let device_channels = supported.channels() as usize;
    let engine_channels = config.channels as usize;

    let stream_config = StreamConfig {
        channels: supported.channels(),
        sample_rate: config.sample_rate,
        buffer_size: CpalBufferSize::Fixed(config.buffer_frames),
    };

    // Scratch for the narrower engine layout when the device is wider
    let mut scratch =
        vec![0.0 as Sample; config.buffer_frames as usize * engine_channels];

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if device_channels == engine_channels {
                    render(data);
                    return;
                }

                let frames = data.len() / device_channels;
                let needed = frames * engine_channels;
                if scratch.len() < needed {
                    scratch.resize(needed, 0.0);
                }
                render(&mut scratch[..needed]);

                for (out_frame, in_frame) in data
                    .chunks_mut(device_channels)
                    .zip(scratch[..needed].chunks(engine_channels))
                {
                    out_frame[..engine_channels].copy_from_slice(in_frame);
                    out_frame[engine_channels..].fill(0.0);
                }
            },
            move |err| {
                log::error!("Audio output stream error: {err}");
                on_error();
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    Ok(stream)
}
