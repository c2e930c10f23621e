//! Audio file decoding
//!
//! WAV goes through hound; FLAC/MP3/OGG go through a symphonia probe loop.
//! Multichannel sources are averaged down to mono, the only layout the
//! player consumes.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use tactus_core::Sample;

use crate::{FileError, FileResult};

// Pre-flight acceptance limits
pub const MAX_SOURCE_CHANNELS: usize = 2;
pub const MIN_SOURCE_RATE: u32 = 8_000;
pub const MAX_SOURCE_RATE: u32 = 96_000;
pub const MIN_DURATION_SECS: f64 = 1.0;
pub const MAX_DURATION_SECS: f64 = 2.0 * 3600.0;

/// Decoded mono audio plus the source metadata it came from.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<Sample>,
    pub sample_rate: u32,
    pub source_channels: usize,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode a file to mono and enforce the acceptance limits.
pub fn decode(path: &Path) -> FileResult<DecodedAudio> {
    if !path.exists() {
        return Err(FileError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let decoded = match ext.as_str() {
        "wav" | "wave" => decode_wav(path)?,
        "flac" | "mp3" | "ogg" | "oga" => decode_with_symphonia(path)?,
        other => return Err(FileError::UnsupportedFormat(other.to_string())),
    };

    validate(&decoded)?;
    log::info!(
        "Decoded {}: {:.2}s @ {}Hz ({} source channel(s))",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("?"),
        decoded.duration_secs(),
        decoded.sample_rate,
        decoded.source_channels
    );
    Ok(decoded)
}

fn validate(audio: &DecodedAudio) -> FileResult<()> {
    if audio.source_channels > MAX_SOURCE_CHANNELS {
        return Err(FileError::TooManyChannels(audio.source_channels));
    }
    if !(MIN_SOURCE_RATE..=MAX_SOURCE_RATE).contains(&audio.sample_rate) {
        return Err(FileError::SampleRateOutOfRange(audio.sample_rate));
    }
    let duration = audio.duration_secs();
    if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration) {
        return Err(FileError::DurationOutOfRange(duration));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// WAV (hound)
// ═══════════════════════════════════════════════════════════════════════════════

fn decode_wav(path: &Path) -> FileResult<DecodedAudio> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    // Channel/rate limits are cheap to check before touching sample data
    if channels > MAX_SOURCE_CHANNELS {
        return Err(FileError::TooManyChannels(channels));
    }
    if !(MIN_SOURCE_RATE..=MAX_SOURCE_RATE).contains(&spec.sample_rate) {
        return Err(FileError::SampleRateOutOfRange(spec.sample_rate));
    }

    let interleaved: Vec<Sample> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.unwrap_or(0.0))
            .collect(),
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as Sample;
            reader
                .into_samples::<i32>()
                .map(|s| s.unwrap_or(0) as Sample / max_value)
                .collect()
        }
    };

    Ok(DecodedAudio {
        samples: mix_to_mono(&interleaved, channels),
        sample_rate: spec.sample_rate,
        source_channels: channels,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// FLAC / MP3 / OGG (symphonia)
// ═══════════════════════════════════════════════════════════════════════════════

fn decode_with_symphonia(path: &Path) -> FileResult<DecodedAudio> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| FileError::Decode(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| FileError::Decode("no supported audio tracks".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| FileError::Decode(e.to_string()))?;

    let mut samples: Vec<Sample> = Vec::new();
    let mut sample_rate = 0u32;
    let mut source_channels = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(FileError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                source_channels = spec.channels.count();

                let mut buf =
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);

                if source_channels == 1 {
                    samples.extend_from_slice(buf.samples());
                } else {
                    for frame in buf.samples().chunks(source_channels) {
                        samples.push(
                            frame.iter().sum::<Sample>() / source_channels as Sample,
                        );
                    }
                }
            }
            Err(SymphoniaError::IoError(_)) => break,
            // Recoverable corruption: skip the packet
            Err(SymphoniaError::DecodeError(_)) => (),
            Err(e) => return Err(FileError::Decode(e.to_string())),
        }
    }

    if sample_rate == 0 || samples.is_empty() {
        return Err(FileError::Decode("no audio frames decoded".to_string()));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        source_channels,
    })
}

/// Average interleaved frames down to mono.
fn mix_to_mono(interleaved: &[Sample], channels: usize) -> Vec<Sample> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<Sample>() / channels as Sample)
        .collect()
}
