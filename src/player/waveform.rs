//! Waveform overview for the terminal player.
//!
//! The decoded track is reduced to one peak per bucket once, then each frame
//! resamples those peaks to the terminal width and draws them as block
//! columns, split into a played and an unplayed part.

/// Peak absolute amplitude of each of `buckets` equal slices of the track.
///
/// Channels are folded together so a bucket never splits a frame.
pub fn compute_peaks(samples: &[f32], channels: u16, buckets: usize) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    let frames = samples.len() / channels;
    if frames == 0 || buckets == 0 {
        return vec![0.0; buckets];
    }

    (0..buckets)
        .map(|bucket| {
            let start = bucket * frames / buckets;
            let end = ((bucket + 1) * frames / buckets).max(start + 1).min(frames);
            samples[start * channels..end * channels]
                .iter()
                .fold(0.0f32, |peak, s| peak.max(s.abs()))
                .min(1.0)
        })
        .collect()
}

/// Pick `width` values from `peaks`, stretching or thinning as needed
pub fn resample(peaks: &[f32], width: usize) -> Vec<f32> {
    if peaks.is_empty() {
        return vec![0.0; width];
    }

    let step = peaks.len() as f32 / width as f32;
    (0..width)
        .map(|i| {
            let idx = (i as f32 * step) as usize;
            peaks.get(idx).copied().unwrap_or(0.0)
        })
        .collect()
}

/// Block glyph for one cell of a column.
///
/// `fill` is how much of the cell the column covers, in eighths.
pub fn block(fill: usize) -> &'static str {
    match fill {
        0 => " ",
        1 => "▁",
        2 => "▂",
        3 => "▃",
        4 => "▄",
        5 => "▅",
        6 => "▆",
        7 => "▇",
        _ => "█",
    }
}

/// Glyph rows (top first) for a column of `amplitude` over `height` rows
pub fn column(amplitude: f32, height: usize) -> Vec<&'static str> {
    let eighths = (amplitude.clamp(0.0, 1.0) * (height * 8) as f32).round() as usize;
    // Keep silence visible as a baseline
    let eighths = eighths.max(1);

    (0..height)
        .rev()
        .map(|row| block(eighths.saturating_sub(row * 8).min(8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_peaks_mono() {
        let samples = [0.1, -0.5, 0.2, 0.9, -0.3, 0.0];
        let peaks = compute_peaks(&samples, 1, 3);
        assert_eq!(peaks, vec![0.5, 0.9, 0.3]);
    }

    #[test]
    fn test_compute_peaks_keeps_frames_together() {
        // L,R pairs; frame 1's loud right channel stays in bucket 0
        let samples = [0.1, 0.1, 0.2, 0.8, 0.3, 0.1, 0.0, 0.4];
        let peaks = compute_peaks(&samples, 2, 2);
        assert_eq!(peaks, vec![0.8, 0.4]);
    }

    #[test]
    fn test_compute_peaks_more_buckets_than_frames() {
        let peaks = compute_peaks(&[0.5, 1.5], 1, 4);
        assert_eq!(peaks.len(), 4);
        assert!(peaks.iter().all(|&p| p <= 1.0));
    }

    #[test]
    fn test_compute_peaks_empty() {
        assert_eq!(compute_peaks(&[], 2, 3), vec![0.0; 3]);
    }

    #[test]
    fn test_resample() {
        let peaks = [0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample(&peaks, 2), vec![0.1, 0.3]);
        assert_eq!(resample(&peaks, 8).len(), 8);
        assert_eq!(resample(&[], 3), vec![0.0; 3]);
    }

    #[test]
    fn test_column() {
        assert_eq!(column(1.0, 2), vec!["█", "█"]);
        assert_eq!(column(0.5, 2), vec![" ", "█"]);
        assert_eq!(column(0.0, 2), vec![" ", "▁"]);
        assert_eq!(column(0.75, 2), vec!["▄", "█"]);
    }
}
