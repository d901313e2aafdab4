//! Audio utility functions shipped with the generated bindings

use std::f32::consts::PI;

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Reference pitch for note conversion (A4)
pub const A4_FREQUENCY: f64 = 440.0;

/// Window shapes for [`generate_window`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    #[default]
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl std::str::FromStr for WindowType {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to a rectangular window
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "hann" | "hanning" => WindowType::Hann,
            "hamming" => WindowType::Hamming,
            "blackman" => WindowType::Blackman,
            _ => WindowType::Rectangular,
        })
    }
}

/// A local maximum found by [`find_peaks`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub value: f32,
}

/// Window coefficients of `length` points
pub fn generate_window(length: usize, window: WindowType) -> Vec<f32> {
    if length < 2 {
        return vec![1.0; length];
    }

    let denom = (length - 1) as f32;
    (0..length)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / denom;
            match window {
                WindowType::Hann => 0.5 * (1.0 - phase.cos()),
                WindowType::Hamming => 0.54 - 0.46 * phase.cos(),
                WindowType::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
                WindowType::Rectangular => 1.0,
            }
        })
        .collect()
}

/// Multiply `data` by a window of the same length
pub fn apply_window(data: &[f32], window: WindowType) -> Vec<f32> {
    data.iter()
        .zip(generate_window(data.len(), window))
        .map(|(sample, w)| sample * w)
        .collect()
}

/// Root mean square; 0.0 for empty input
pub fn rms(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f64 = data.iter().map(|&s| (s as f64).powi(2)).sum();
    (sum / data.len() as f64).sqrt() as f32
}

/// Strict local maxima above `threshold`, endpoints excluded
pub fn find_peaks(data: &[f32], threshold: f32) -> Vec<Peak> {
    data.windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0] && w[1] > w[2] && w[1] > threshold)
        .map(|(i, w)| Peak {
            index: i + 1,
            value: w[1],
        })
        .collect()
}

/// Nearest equal-tempered note name with octave, e.g. `A4`
///
/// Non-positive frequencies yield `None`.
pub fn frequency_to_note(frequency: f64) -> Option<String> {
    if frequency <= 0.0 || !frequency.is_finite() {
        return None;
    }
    // Semitones relative to C0
    let semitones = (12.0 * (frequency / A4_FREQUENCY).log2()).round() as i64 + 57;
    let octave = semitones.div_euclid(12);
    let index = semitones.rem_euclid(12) as usize;
    Some(format!("{}{}", NOTE_NAMES[index], octave))
}

/// Frequency of a note name such as `A4`, `C#3` or `Bb2`
pub fn note_to_frequency(note: &str) -> Option<f64> {
    let note = note.trim();
    let split = note.find(|c: char| c.is_ascii_digit() || c == '-')?;
    let (name, octave) = note.split_at(split);
    let octave: i64 = octave.parse().ok()?;

    let mut chars = name.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base = NOTE_NAMES.iter().position(|n| n.starts_with(letter) && n.len() == 1)? as i64;
    let offset = match chars.as_str() {
        "" => 0,
        "#" => 1,
        "b" => -1,
        _ => return None,
    };

    let semitones_from_a4 = (octave * 12 + base + offset) - 57;
    Some(A4_FREQUENCY * 2f64.powf(semitones_from_a4 as f64 / 12.0))
}

/// Index into the chromatic note names, wrapping
pub fn note_name(index: i64) -> &'static str {
    NOTE_NAMES[index.rem_euclid(12) as usize]
}

pub fn bpm_to_period(bpm: f64) -> f64 {
    60.0 / bpm
}

pub fn period_to_bpm(period: f64) -> f64 {
    60.0 / period
}

/// Convert decibels to linear gain
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test_case(440.0, "A4")]
    #[test_case(261.63, "C4")]
    #[test_case(27.5, "A0")]
    #[test_case(466.16, "A#4")]
    #[test_case(16.35, "C0")]
    fn test_frequency_to_note(frequency: f64, expected: &str) {
        assert_eq!(frequency_to_note(frequency).as_deref(), Some(expected));
    }

    #[test]
    fn test_frequency_to_note_rejects_non_positive() {
        assert_eq!(frequency_to_note(0.0), None);
        assert_eq!(frequency_to_note(-10.0), None);
    }

    #[test]
    fn test_note_to_frequency() {
        assert_relative_eq!(note_to_frequency("A4").unwrap(), 440.0);
        assert_relative_eq!(note_to_frequency("A5").unwrap(), 880.0);
        assert_relative_eq!(note_to_frequency("C4").unwrap(), 261.6256, epsilon = 1e-3);
        assert_relative_eq!(
            note_to_frequency("Bb3").unwrap(),
            note_to_frequency("A#3").unwrap()
        );
        assert_eq!(note_to_frequency("H2"), None);
    }

    #[test]
    fn test_hann_window_endpoints() {
        let window = generate_window(5, WindowType::Hann);
        assert_relative_eq!(window[0], 0.0);
        assert_relative_eq!(window[2], 1.0);
        assert_relative_eq!(window[4], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_unknown_window_is_rectangular() {
        let window: WindowType = "kaiser".parse().unwrap();
        assert_eq!(apply_window(&[0.5, 0.5], window), vec![0.5, 0.5]);
    }

    #[test]
    fn test_rms() {
        assert_relative_eq!(rms(&[1.0, -1.0, 1.0, -1.0]), 1.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_find_peaks() {
        let peaks = find_peaks(&[0.0, 0.5, 0.2, 0.05, 0.08, 0.0, 0.9, 0.9], 0.1);
        assert_eq!(peaks, vec![Peak { index: 1, value: 0.5 }]);
    }

    #[test]
    fn test_bpm_period() {
        assert_relative_eq!(bpm_to_period(120.0), 0.5);
        assert_relative_eq!(period_to_bpm(0.5), 120.0);
    }
}
