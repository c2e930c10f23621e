//! Channel masks and their validation rules
//!
//! A channel mask selects which physical output channels carry the mono
//! source. Masks arriving from remote clients can have any length and any
//! values; validation normalizes them to exactly the configured channel
//! count or rejects them.

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Per-output-channel enable bits, length equals the output channel count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMask(Vec<u8>);

/// How a mask was adjusted during validation. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskAdjustment {
    /// Input was longer than the target channel count
    Truncated { from: usize },
    /// Input was shorter and got right-padded with zeros
    Padded { from: usize },
}

/// Result of a successful validation
#[derive(Debug, Clone)]
pub struct MaskReport {
    pub mask: ChannelMask,
    pub adjustment: Option<MaskAdjustment>,
}

impl ChannelMask {
    /// Mask with every channel enabled (the static default).
    pub fn all_enabled(channels: usize) -> Self {
        Self(vec![1; channels])
    }

    /// Validate a raw mask against the configured channel count.
    ///
    /// Rules, in order:
    /// 1. Targets below 2 channels cannot be reconfigured at all.
    /// 2. Longer than target: truncate.
    /// 3. Shorter than target: right-pad with zeros, but only if the input
    ///    has at least 2 entries; shorter inputs are ambiguous and rejected.
    /// 4. Every element must be exactly 0 or 1.
    pub fn validate(input: &[i64], target_channels: usize) -> CoreResult<MaskReport> {
        if target_channels < 2 {
            return Err(CoreError::MaskTargetTooSmall(target_channels));
        }

        let original_len = input.len();
        let mut adjustment = None;

        let working: &[i64] = if original_len > target_channels {
            adjustment = Some(MaskAdjustment::Truncated { from: original_len });
            &input[..target_channels]
        } else {
            if original_len < target_channels && original_len < 2 {
                return Err(CoreError::MaskTooShort(original_len));
            }
            input
        };

        let mut bits = Vec::with_capacity(target_channels);
        for (index, &value) in working.iter().enumerate() {
            match value {
                0 | 1 => bits.push(value as u8),
                other => return Err(CoreError::MaskValue { index, value: other }),
            }
        }

        if bits.len() < target_channels {
            adjustment = Some(MaskAdjustment::Padded { from: original_len });
            bits.resize(target_channels, 0);
        }

        Ok(MaskReport {
            mask: Self(bits),
            adjustment,
        })
    }

    /// Number of output channels this mask spans
    pub fn channel_count(&self) -> usize {
        self.0.len()
    }

    /// Number of enabled channels
    pub fn enabled_channels(&self) -> usize {
        self.0.iter().filter(|&&b| b == 1).count()
    }

    /// True when no channel is enabled (playback would be silent)
    pub fn is_silent(&self) -> bool {
        self.enabled_channels() == 0
    }

    /// Per-channel enable bits
    pub fn bits(&self) -> &[u8] {
        &self.0
    }

    pub fn is_enabled(&self, channel: usize) -> bool {
        self.0.get(channel).copied() == Some(1)
    }
}

impl std::fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{b}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_length_accepted() {
        let report = ChannelMask::validate(&[1, 0], 2).unwrap();
        assert_eq!(report.mask.bits(), &[1, 0]);
        assert!(report.adjustment.is_none());
    }

    #[test]
    fn test_truncates_long_mask() {
        let report = ChannelMask::validate(&[1, 0, 1], 2).unwrap();
        assert_eq!(report.mask.bits(), &[1, 0]);
        assert_eq!(
            report.adjustment,
            Some(MaskAdjustment::Truncated { from: 3 })
        );
    }

    #[test]
    fn test_pads_short_mask() {
        let report = ChannelMask::validate(&[1, 0], 4).unwrap();
        assert_eq!(report.mask.bits(), &[1, 0, 0, 0]);
        assert_eq!(report.adjustment, Some(MaskAdjustment::Padded { from: 2 }));
    }

    #[test]
    fn test_rejects_single_entry_needing_padding() {
        assert!(matches!(
            ChannelMask::validate(&[1], 3),
            Err(CoreError::MaskTooShort(1))
        ));
    }

    #[test]
    fn test_rejects_single_channel_target() {
        assert!(matches!(
            ChannelMask::validate(&[1], 1),
            Err(CoreError::MaskTargetTooSmall(1))
        ));
    }

    #[test]
    fn test_rejects_non_binary_values() {
        assert!(matches!(
            ChannelMask::validate(&[1, 2], 2),
            Err(CoreError::MaskValue { index: 1, value: 2 })
        ));
        assert!(matches!(
            ChannelMask::validate(&[-1, 1], 2),
            Err(CoreError::MaskValue { index: 0, value: -1 })
        ));
    }

    #[test]
    fn test_output_length_always_matches_target() {
        for target in 2..=8usize {
            for input in [
                vec![1i64],
                vec![1, 0],
                vec![0, 1, 1],
                vec![1; 12],
                vec![0; 12],
            ] {
                if let Ok(report) = ChannelMask::validate(&input, target) {
                    assert_eq!(report.mask.channel_count(), target);
                    assert!(report.mask.bits().iter().all(|&b| b == 0 || b == 1));
                }
            }
        }
    }

    #[test]
    fn test_silent_mask_detection() {
        let report = ChannelMask::validate(&[0, 0], 2).unwrap();
        assert!(report.mask.is_silent());
        assert_eq!(report.mask.enabled_channels(), 0);
    }
}
