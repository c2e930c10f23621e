//! Waveform storage, multichannel templates and the swap slot
//!
//! A template is the precomputed interleaved multichannel buffer that the
//! render path streams to the device. Templates are immutable once built;
//! a mask or file change always produces a whole new template.

use std::sync::Arc;

use parking_lot::Mutex;

use tactus_core::{ChannelMask, Sample};

// ═══════════════════════════════════════════════════════════════════════════════
// WAVEFORM STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Decoded, resampled mono source for the currently loaded file.
///
/// Replaced wholesale on every load; shared read-only with background
/// template builders through an `Arc`.
#[derive(Debug)]
pub struct WaveformStore {
    samples: Vec<Sample>,
    sample_rate: u32,
}

impl WaveformStore {
    pub fn new(samples: Vec<Sample>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Empty store used before the first file load.
    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MULTICHANNEL TEMPLATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Interleaved frame-major multichannel buffer streamed to the device.
#[derive(Debug)]
pub struct MultichannelTemplate {
    data: Vec<Sample>,
    channels: usize,
    frames: usize,
}

impl MultichannelTemplate {
    /// Template with no frames (placeholder before the first load).
    pub fn silent(channels: usize) -> Self {
        Self {
            data: Vec::new(),
            channels,
            frames: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Interleaved samples for the frame range `[from, to)`.
    pub fn frame_range(&self, from: usize, to: usize) -> &[Sample] {
        &self.data[from * self.channels..to * self.channels]
    }

    pub fn data(&self) -> &[Sample] {
        &self.data
    }
}

/// Expand a mono waveform into a multichannel template.
///
/// `out[frame][ch] = mono[frame]` where the mask enables `ch`, else 0.0.
/// Pure and deterministic; safe to run on a background thread.
pub fn build_template(mono: &[Sample], mask: &ChannelMask) -> MultichannelTemplate {
    let channels = mask.channel_count();
    let frames = mono.len();
    let mut data = vec![0.0; frames * channels];

    for (ch, &bit) in mask.bits().iter().enumerate() {
        if bit == 1 {
            for (frame, &sample) in mono.iter().enumerate() {
                data[frame * channels + ch] = sample;
            }
        }
    }

    MultichannelTemplate {
        data,
        channels,
        frames,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE SWAP SLOT
// ═══════════════════════════════════════════════════════════════════════════════

/// A template waiting to be adopted by the render path.
#[derive(Debug)]
pub struct PendingTemplate {
    pub template: Arc<MultichannelTemplate>,
    pub mask: ChannelMask,
}

/// Single-pending-entry hand-off between background template construction
/// and the render path.
///
/// `stage` overwrites any existing entry (last writer wins). `try_adopt`
/// never blocks: on lock contention it simply reports nothing pending and
/// the render path retries on its next invocation.
#[derive(Debug, Default)]
pub struct TemplateSwapSlot {
    pending: Mutex<Option<PendingTemplate>>,
}

impl TemplateSwapSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a freshly built template. Called from background threads.
    pub fn stage(&self, template: Arc<MultichannelTemplate>, mask: ChannelMask) {
        let mut pending = self.pending.lock();
        if pending.is_some() {
            log::debug!("Superseding previously staged template");
        }
        *pending = Some(PendingTemplate { template, mask });
    }

    /// Take the pending template, if any. Called only from the render path.
    pub fn try_adopt(&self) -> Option<PendingTemplate> {
        self.pending.try_lock()?.take()
    }

    /// Drop any staged entry (used when the source file is replaced).
    pub fn clear(&self) {
        *self.pending.lock() = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}
