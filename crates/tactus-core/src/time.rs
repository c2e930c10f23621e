//! Position and volume formatting helpers

/// Convert a sample position to an MM:SS string.
pub fn format_time(samples: usize, sample_rate: u32) -> String {
    if sample_rate == 0 {
        return "00:00".to_string();
    }
    let total_seconds = samples as u64 / sample_rate as u64;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

/// Volume factor as an integer percentage (0..=200).
pub fn volume_percentage(factor: f32) -> u32 {
    (factor * 100.0).round() as u32
}
