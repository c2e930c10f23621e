//! Band-limited resampling to the device rate

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

use tactus_core::Sample;

use crate::{FileError, FileResult};

const CHUNK_FRAMES: usize = 1024;

/// Resample mono audio from `source_rate` to `target_rate`.
///
/// Output length is exactly `round(len * target / source)`; identical rates
/// pass through untouched.
pub fn resample(
    samples: &[Sample],
    source_rate: u32,
    target_rate: u32,
) -> FileResult<Vec<Sample>> {
    if samples.is_empty() {
        return Err(FileError::EmptyResample);
    }
    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let expected = (samples.len() as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<Sample>::new(ratio, 2.0, params, CHUNK_FRAMES, 1)
        .map_err(|e| FileError::Resample(e.to_string()))?;

    let mut output: Vec<Sample> = Vec::with_capacity(expected + CHUNK_FRAMES);
    let mut pos = 0;

    while pos + CHUNK_FRAMES <= samples.len() {
        let chunk: &[&[Sample]] = &[&samples[pos..pos + CHUNK_FRAMES]];
        let mut out = resampler
            .process(chunk, None)
            .map_err(|e| FileError::Resample(e.to_string()))?;
        output.append(&mut out[0]);
        pos += CHUNK_FRAMES;
    }

    if pos < samples.len() {
        let tail: &[&[Sample]] = &[&samples[pos..]];
        let mut out = resampler
            .process_partial(Some(tail), None)
            .map_err(|e| FileError::Resample(e.to_string()))?;
        output.append(&mut out[0]);
    }

    // Drain the filter's internal delay line
    let mut out = resampler
        .process_partial(None::<&[&[Sample]]>, None)
        .map_err(|e| FileError::Resample(e.to_string()))?;
    output.append(&mut out[0]);

    if output.is_empty() || expected == 0 {
        return Err(FileError::EmptyResample);
    }
    output.resize(expected, 0.0);

    log::debug!(
        "Resampled {} -> {} frames ({}Hz -> {}Hz)",
        samples.len(),
        output.len(),
        source_rate,
        target_rate
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_passthrough() {
        let input: Vec<Sample> = (0..4_000).map(|i| (i as Sample * 0.001).sin()).collect();
        let output = resample(&input, 48_000, 48_000).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_upsample_length() {
        let input = vec![0.25; 8_000];
        let output = resample(&input, 8_000, 16_000).unwrap();
        assert_eq!(output.len(), 16_000);
    }

    #[test]
    fn test_downsample_length() {
        let input = vec![0.25; 48_000];
        let output = resample(&input, 48_000, 44_100).unwrap();
        assert_eq!(output.len(), 44_100);
    }

    #[test]
    fn test_non_integer_ratio_length() {
        let input = vec![0.1; 10_001];
        let output = resample(&input, 44_100, 48_000).unwrap();
        let expected = (10_001f64 * 48_000.0 / 44_100.0).round() as usize;
        assert_eq!(output.len(), expected);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            resample(&[], 44_100, 48_000),
            Err(FileError::EmptyResample)
        ));
    }
}
