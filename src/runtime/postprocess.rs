//! Reshape raw native output into named fields
//!
//! Rules are looked up by algorithm name first, then by category; anything
//! without a rule returns the raw vector unchanged. Loaders also report the
//! sample rate and channel layout of what they read.

use std::collections::BTreeMap;

use serde::Serialize;

use super::audio::DEFAULT_SAMPLE_RATE;
use super::input::SourceInfo;
use super::params::{ParameterValue, Parameters};
use super::utils::note_name;
use crate::metadata::Category;

/// One named output value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    Real(f32),
    Vector(Vec<f32>),
    Text(String),
}

impl Field {
    pub fn as_real(&self) -> Option<f32> {
        match self {
            Field::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Field::Vector(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Result of one compute call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Raw(Vec<f32>),
    Fields(BTreeMap<String, Field>),
}

impl Output {
    pub fn field(&self, name: &str) -> Option<&Field> {
        match self {
            Output::Fields(fields) => fields.get(name),
            Output::Raw(_) => None,
        }
    }

    pub fn real(&self, name: &str) -> Option<f32> {
        self.field(name).and_then(Field::as_real)
    }

    pub fn vector(&self, name: &str) -> Option<&[f32]> {
        self.field(name).and_then(Field::as_vector)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Field::as_text)
    }

    pub fn raw(&self) -> Option<&[f32]> {
        match self {
            Output::Raw(values) => Some(values),
            Output::Fields(_) => None,
        }
    }
}

/// What a rule may read besides the raw values
#[derive(Debug, Clone, Copy)]
pub struct OutputContext<'a> {
    pub parameters: &'a Parameters,
    /// Header of the file a loader read
    pub source: Option<SourceInfo>,
}

impl<'a> OutputContext<'a> {
    pub fn new(parameters: &'a Parameters) -> Self {
        Self {
            parameters,
            source: None,
        }
    }

    pub fn with_source(mut self, source: Option<SourceInfo>) -> Self {
        self.source = source;
        self
    }

    /// Requested rate, else the source file's, else the library default
    fn sample_rate(&self) -> f32 {
        self.parameters
            .get("sampleRate")
            .and_then(ParameterValue::as_f64)
            .map(|rate| rate as f32)
            .or_else(|| self.source.map(|s| s.sample_rate as f32))
            .unwrap_or(DEFAULT_SAMPLE_RATE as f32)
    }
}

type Rule = fn(&[f32]) -> Output;
type LoaderRule = fn(Vec<f32>, &OutputContext<'_>) -> Output;

/// Io entities that report the layout of what they read
const LOADER_RULES: &[(&str, LoaderRule)] = &[
    ("AudioLoader", audio_loader),
    ("MonoLoader", mono_loader),
];

/// `(category, algorithm name or category-wide, rule)`, first match wins
const RULES: &[(Category, Option<&str>, Rule)] = &[
    (Category::Spectral, Some("SpectralCentroid"), scalar_value),
    (Category::Spectral, Some("SpectralRolloff"), scalar_value),
    (Category::Spectral, Some("MFCC"), coefficients),
    (Category::Spectral, Some("MelBands"), bands),
    (Category::Spectral, Some("BarkBands"), bands),
    (Category::Spectral, Some("SpectralPeaks"), spectral_peaks),
    (Category::Spectral, Some("FFT"), fft),
    (Category::Spectral, None, spectrum),
    (Category::Temporal, Some("Energy"), scalar_value),
    (Category::Temporal, Some("RMS"), scalar_value),
    (Category::Temporal, Some("ZeroCrossingRate"), scalar_value),
    (Category::Temporal, Some("Envelope"), envelope),
    (Category::Temporal, None, values),
    (Category::Tonal, Some("PitchYin"), pitch),
    (Category::Tonal, Some("PitchYinFFT"), pitch),
    (Category::Tonal, Some("Key"), key),
    (Category::Tonal, Some("HPCP"), chroma),
    (Category::Tonal, Some("Chromagram"), chroma),
    (Category::Tonal, None, tonal_features),
    (Category::Rhythm, Some("RhythmExtractor"), rhythm_extractor),
    (Category::Rhythm, Some("OnsetDetection"), onsets),
    (Category::Rhythm, Some("TempoTap"), tempo),
    (Category::Rhythm, None, rhythm_features),
    (Category::Stats, Some("Mean"), scalar_value),
    (Category::Stats, Some("Variance"), scalar_value),
    (Category::Stats, Some("Centroid"), scalar_value),
    (Category::Stats, Some("DistributionShape"), distribution_shape),
    (Category::Stats, None, statistics),
    (Category::Standard, Some("FFT"), fft),
];

/// Apply the reshaping rule for `name` in `category`
pub fn post_process(
    name: &str,
    category: Category,
    context: &OutputContext<'_>,
    raw: Vec<f32>,
) -> Output {
    if category == Category::Io {
        if let Some((_, rule)) = LOADER_RULES.iter().find(|(n, _)| *n == name) {
            return rule(raw, context);
        }
    }

    let by_name = RULES
        .iter()
        .find(|(c, n, _)| *c == category && *n == Some(name));
    let by_category = || RULES.iter().find(|(c, n, _)| *c == category && n.is_none());

    match by_name.or_else(by_category) {
        Some((_, _, rule)) => rule(&raw),
        None => Output::Raw(raw),
    }
}

fn fields<const N: usize>(entries: [(&str, Field); N]) -> Output {
    Output::Fields(
        entries
            .into_iter()
            .map(|(name, field)| (name.to_string(), field))
            .collect(),
    )
}

fn first(raw: &[f32]) -> f32 {
    raw.first().copied().unwrap_or(0.0)
}

fn named_vector(name: &str, raw: &[f32]) -> Output {
    fields([(name, Field::Vector(raw.to_vec()))])
}

fn scalar_value(raw: &[f32]) -> Output {
    fields([("value", Field::Real(first(raw)))])
}

fn coefficients(raw: &[f32]) -> Output {
    named_vector("coefficients", raw)
}

fn bands(raw: &[f32]) -> Output {
    named_vector("bands", raw)
}

fn spectral_peaks(raw: &[f32]) -> Output {
    let (frequencies, magnitudes) = raw.split_at(raw.len() / 2);
    fields([
        ("frequencies", Field::Vector(frequencies.to_vec())),
        ("magnitudes", Field::Vector(magnitudes.to_vec())),
    ])
}

fn spectrum(raw: &[f32]) -> Output {
    named_vector("spectrum", raw)
}

fn fft(raw: &[f32]) -> Output {
    let (real, imaginary) = raw.split_at(raw.len() / 2);
    fields([
        ("real", Field::Vector(real.to_vec())),
        ("imaginary", Field::Vector(imaginary.to_vec())),
    ])
}

fn audio_loader(raw: Vec<f32>, context: &OutputContext<'_>) -> Output {
    let channels = context.source.map_or(1, |s| s.channels.max(1));
    fields([
        ("audio", Field::Vector(raw)),
        ("sampleRate", Field::Real(context.sample_rate())),
        ("channels", Field::Real(f32::from(channels))),
    ])
}

fn mono_loader(raw: Vec<f32>, context: &OutputContext<'_>) -> Output {
    fields([
        ("audio", Field::Vector(raw)),
        ("sampleRate", Field::Real(context.sample_rate())),
    ])
}

fn envelope(raw: &[f32]) -> Output {
    named_vector("envelope", raw)
}

fn values(raw: &[f32]) -> Output {
    named_vector("values", raw)
}

fn pitch(raw: &[f32]) -> Output {
    fields([
        ("pitch", Field::Real(first(raw))),
        ("confidence", Field::Real(raw.get(1).copied().unwrap_or(0.0))),
    ])
}

fn key(raw: &[f32]) -> Output {
    let key = raw
        .first()
        .map(|&index| note_name(index as i64))
        .unwrap_or("C");
    let scale = match raw.get(1) {
        Some(&mode) if mode != 0.0 => "minor",
        _ => "major",
    };
    fields([
        ("key", Field::Text(key.to_string())),
        ("scale", Field::Text(scale.to_string())),
        ("strength", Field::Real(raw.get(2).copied().unwrap_or(0.0))),
    ])
}

fn chroma(raw: &[f32]) -> Output {
    named_vector("chroma", raw)
}

fn tonal_features(raw: &[f32]) -> Output {
    named_vector("tonal_features", raw)
}

fn rhythm_extractor(raw: &[f32]) -> Output {
    let beats = raw.get(1..).unwrap_or_default();
    fields([
        ("bpm", Field::Real(first(raw))),
        ("beats", Field::Vector(beats.to_vec())),
    ])
}

fn onsets(raw: &[f32]) -> Output {
    named_vector("onsets", raw)
}

fn tempo(raw: &[f32]) -> Output {
    fields([("tempo", Field::Real(first(raw)))])
}

fn rhythm_features(raw: &[f32]) -> Output {
    named_vector("rhythm_features", raw)
}

fn distribution_shape(raw: &[f32]) -> Output {
    let at = |i: usize| Field::Real(raw.get(i).copied().unwrap_or(0.0));
    fields([("spread", at(0)), ("skewness", at(1)), ("kurtosis", at(2))])
}

fn statistics(raw: &[f32]) -> Output {
    named_vector("statistics", raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shape(name: &str, category: Category, raw: Vec<f32>) -> Output {
        post_process(name, category, &OutputContext::new(&Parameters::new()), raw)
    }

    #[test]
    fn test_pitch_yin_fields() {
        let output = shape("PitchYin", Category::Tonal, vec![220.0, 0.87]);
        assert_eq!(output.real("pitch"), Some(220.0));
        assert_eq!(output.real("confidence"), Some(0.87));
    }

    #[test]
    fn test_key_maps_index_to_note() {
        let output = shape("Key", Category::Tonal, vec![9.0, 1.0, 0.6]);
        assert_eq!(output.text("key"), Some("A"));
        assert_eq!(output.text("scale"), Some("minor"));
        assert_eq!(output.real("strength"), Some(0.6));
    }

    #[test]
    fn test_key_defaults_on_empty_output() {
        let output = shape("Key", Category::Tonal, Vec::new());
        assert_eq!(output.text("key"), Some("C"));
        assert_eq!(output.text("scale"), Some("major"));
        assert_eq!(output.real("strength"), Some(0.0));
    }

    #[test]
    fn test_spectral_peaks_split_at_midpoint() {
        let output = shape(
            "SpectralPeaks",
            Category::Spectral,
            vec![100.0, 200.0, 0.5, 0.25],
        );
        assert_eq!(output.vector("frequencies"), Some(&[100.0, 200.0][..]));
        assert_eq!(output.vector("magnitudes"), Some(&[0.5, 0.25][..]));
    }

    #[test]
    fn test_rhythm_extractor_splits_bpm_and_beats() {
        let output = shape("RhythmExtractor", Category::Rhythm, vec![120.0, 0.5, 1.0]);
        assert_eq!(output.real("bpm"), Some(120.0));
        assert_eq!(output.vector("beats"), Some(&[0.5, 1.0][..]));
    }

    #[test]
    fn test_category_fallback() {
        let output = shape("Spectrum", Category::Spectral, vec![1.0, 2.0]);
        assert_eq!(output.vector("spectrum"), Some(&[1.0, 2.0][..]));

        let output = shape("Median", Category::Stats, vec![3.0]);
        assert_eq!(output.vector("statistics"), Some(&[3.0][..]));
    }

    #[test]
    fn test_name_rule_is_scoped_to_category() {
        // An "RMS" in another category does not pick up the temporal rule
        let output = shape("RMS", Category::Standard, vec![0.3]);
        assert_eq!(output, Output::Raw(vec![0.3]));
    }

    #[test]
    fn test_distribution_shape() {
        let output = shape("DistributionShape", Category::Stats, vec![1.0, 2.0]);
        assert_eq!(output.real("spread"), Some(1.0));
        assert_eq!(output.real("skewness"), Some(2.0));
        assert_eq!(output.real("kurtosis"), Some(0.0));
    }

    #[test]
    fn test_fft_splits_real_and_imaginary() {
        let output = shape("FFT", Category::Standard, vec![1.0, 0.5, 0.0, -0.5]);
        assert_eq!(output.vector("real"), Some(&[1.0, 0.5][..]));
        assert_eq!(output.vector("imaginary"), Some(&[0.0, -0.5][..]));

        let output = shape("FFT", Category::Spectral, vec![2.0, 3.0]);
        assert_eq!(output.vector("imaginary"), Some(&[3.0][..]));
    }

    #[test]
    fn test_mono_loader_reports_requested_rate() {
        let mut parameters = Parameters::new();
        parameters.insert("sampleRate".to_string(), 22050.into());
        let context = OutputContext::new(&parameters);

        let output = post_process("MonoLoader", Category::Io, &context, vec![0.1, 0.2]);
        assert_eq!(output.vector("audio"), Some(&[0.1, 0.2][..]));
        assert_eq!(output.real("sampleRate"), Some(22050.0));
        assert_eq!(output.field("channels"), None);
    }

    #[test]
    fn test_audio_loader_reports_source_layout() {
        let parameters = Parameters::new();
        let source = SourceInfo {
            sample_rate: 48_000,
            channels: 2,
            frames: 1,
        };
        let context = OutputContext::new(&parameters).with_source(Some(source));

        let output = post_process("AudioLoader", Category::Io, &context, vec![0.5, -0.5]);
        assert_eq!(output.vector("audio"), Some(&[0.5, -0.5][..]));
        assert_eq!(output.real("sampleRate"), Some(48_000.0));
        assert_eq!(output.real("channels"), Some(2.0));
    }

    #[test]
    fn test_loader_without_source_uses_default_rate() {
        let output = shape("AudioLoader", Category::Io, vec![0.0]);
        assert_eq!(output.real("sampleRate"), Some(44_100.0));
        assert_eq!(output.real("channels"), Some(1.0));

        let output = shape("EasyLoader", Category::Io, vec![0.0]);
        assert_eq!(output, Output::Raw(vec![0.0]));
    }
}
