//! Compute inputs and the per-category input-shape contract

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use hound::WavReader;

use super::audio::AudioVector;
use super::algorithm::AlgorithmSpec;
use super::params::{ParameterValue, Parameters};
use crate::error::{Result, SigbindError};
use crate::metadata::Category;

/// First loader buffer when the source header is unreadable, ten seconds of
/// 44.1 kHz mono; loaders grow to the length the native side reports
pub const LOADER_INITIAL_CAPACITY: usize = 44_100 * 10;

/// Fallback capacity when the input is empty or not an array
const DEFAULT_OUTPUT_CAPACITY: usize = 1024;

const DEFAULT_MFCC_COEFFICIENTS: usize = 13;
const DEFAULT_MEL_BANDS: usize = 24;

/// Layout of the file a loader reads, taken from its WAV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u32,
}

impl SourceInfo {
    /// None for anything `hound` cannot open
    pub fn read(path: &Path) -> Option<Self> {
        let reader = WavReader::open(path).ok()?;
        let spec = reader.spec();
        Some(Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            frames: reader.duration(),
        })
    }
}

/// A value handed to `compute`
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Samples(Vec<f32>),
    Audio(AudioVector),
    Scalar(f64),
    Path(PathBuf),
}

impl Input {
    pub fn kind(&self) -> &'static str {
        match self {
            Input::Samples(_) => "array",
            Input::Audio(_) => "AudioVector",
            Input::Scalar(_) => "scalar",
            Input::Path(_) => "file path",
        }
    }

    /// Number of samples for array-like inputs
    pub fn len(&self) -> Option<usize> {
        match self {
            Input::Samples(samples) => Some(samples.len()),
            Input::Audio(audio) => Some(audio.len()),
            Input::Scalar(_) | Input::Path(_) => None,
        }
    }

    /// Native buffer for this input; paths travel as a parameter instead
    pub(crate) fn buffer(&self) -> Cow<'_, [f32]> {
        match self {
            Input::Samples(samples) => Cow::Borrowed(samples),
            Input::Audio(audio) => Cow::Borrowed(audio.data()),
            Input::Scalar(value) => Cow::Owned(vec![*value as f32]),
            Input::Path(_) => Cow::Owned(Vec::new()),
        }
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        match self {
            Input::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl From<Vec<f32>> for Input {
    fn from(samples: Vec<f32>) -> Self {
        Input::Samples(samples)
    }
}

impl From<&[f32]> for Input {
    fn from(samples: &[f32]) -> Self {
        Input::Samples(samples.to_vec())
    }
}

impl From<AudioVector> for Input {
    fn from(audio: AudioVector) -> Self {
        Input::Audio(audio)
    }
}

impl From<f64> for Input {
    fn from(value: f64) -> Self {
        Input::Scalar(value)
    }
}

impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Self {
        Input::Path(path)
    }
}

impl From<&Path> for Input {
    fn from(path: &Path) -> Self {
        Input::Path(path.to_path_buf())
    }
}

/// Whether `name` reads audio from a file
pub fn is_loader(name: &str) -> bool {
    name.ends_with("Loader")
}

/// Whether `name` writes audio to a file
pub fn is_writer(name: &str) -> bool {
    name.ends_with("Writer")
}

/// Check `input` against the shape contract of `spec`'s category
///
/// Runs before any native call, including lazy handle creation.
pub fn validate(spec: &AlgorithmSpec, input: &Input) -> Result<()> {
    let array_like = matches!(input, Input::Samples(_) | Input::Audio(_));
    let reject = |expected: &str| {
        Err(SigbindError::InvalidInput {
            algorithm: spec.name.to_string(),
            expected: expected.to_string(),
        })
    };

    match spec.category {
        Category::Spectral | Category::Temporal | Category::Tonal | Category::MachineLearning => {
            if !array_like {
                return reject("array or AudioVector");
            }
        }
        Category::Rhythm | Category::Filters => {
            if !matches!(input, Input::Samples(_)) {
                return reject("array");
            }
        }
        Category::Io if is_loader(spec.name) => match input {
            Input::Path(path) if path.exists() => {}
            Input::Path(path) => {
                return Err(SigbindError::InputFileNotFound { path: path.clone() });
            }
            _ => return reject("string file path"),
        },
        Category::Io if is_writer(spec.name) => {
            if !array_like {
                return reject("AudioVector or array");
            }
        }
        Category::Io | Category::Standard => {}
        _ => {
            if matches!(input, Input::Path(_)) {
                return reject("array, AudioVector or numeric");
            }
        }
    }
    Ok(())
}

/// Output buffer size for the generic compute path
///
/// Loaders are sized from `source`; a few well-known algorithms are sized
/// from their parameters; everything else from the input length and
/// category.
pub fn estimate_output_capacity(
    spec: &AlgorithmSpec,
    input: &Input,
    parameters: &Parameters,
    source: Option<SourceInfo>,
) -> usize {
    if spec.category == Category::Io && is_loader(spec.name) {
        return source.map_or(LOADER_INITIAL_CAPACITY, |source| {
            loader_capacity(spec.name, &source, parameters)
        });
    }

    let len = input.len().filter(|&n| n > 0);
    let sized = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| parameters.get(*key))
            .and_then(ParameterValue::as_f64)
            .filter(|&n| n >= 1.0)
            .map(|n| n as usize)
    };
    let named = match spec.name {
        "MFCC" => Some(
            sized(&["numberCoefficients", "numCoeffs"]).unwrap_or(DEFAULT_MFCC_COEFFICIENTS),
        ),
        "MelBands" => Some(sized(&["numberBands"]).unwrap_or(DEFAULT_MEL_BANDS)),
        "Windowing" => sized(&["size", "frameSize"]).or(len),
        // Real and imaginary halves
        "FFT" => sized(&["size"]).or(len).map(|n| n * 2),
        _ => None,
    };
    if let Some(capacity) = named {
        return capacity;
    }

    match spec.category {
        Category::Spectral => len.map(|n| (n / 2).max(1)),
        Category::Temporal | Category::Tonal => len,
        Category::Stats => Some(16),
        Category::Rhythm => Some(256),
        _ => len,
    }
    .unwrap_or(DEFAULT_OUTPUT_CAPACITY)
}

/// Samples a loader writes for `source` at the requested rate
fn loader_capacity(name: &str, source: &SourceInfo, parameters: &Parameters) -> usize {
    let source_rate = u64::from(source.sample_rate.max(1));
    let target_rate = parameters
        .get("sampleRate")
        .and_then(ParameterValue::as_f64)
        .filter(|&rate| rate >= 1.0)
        .map_or(source_rate, |rate| rate as u64);
    let channels = if name == "AudioLoader" {
        u64::from(source.channels.max(1))
    } else {
        1
    };

    let frames = (u64::from(source.frames) * target_rate).div_ceil(source_rate);
    usize::try_from(frames * channels).unwrap_or(usize::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Mode;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn spec(name: &'static str, category: Category) -> AlgorithmSpec {
        AlgorithmSpec {
            name,
            category,
            mode: Mode::Standard,
            valid_parameters: &[],
        }
    }

    #[test_case(Category::Spectral)]
    #[test_case(Category::Temporal)]
    #[test_case(Category::Tonal)]
    #[test_case(Category::MachineLearning)]
    fn test_array_categories_reject_scalars(category: Category) {
        let spec = spec("Thing", category);
        assert!(validate(&spec, &Input::Samples(vec![0.0; 4])).is_ok());
        let audio = AudioVector::from_samples(vec![0.0; 4], 44_100).unwrap();
        assert!(validate(&spec, &Input::Audio(audio)).is_ok());

        let err = validate(&spec, &Input::Scalar(1.0)).unwrap_err();
        assert_eq!(err.to_string(), "Thing expects array or AudioVector input");
    }

    #[test]
    fn test_rhythm_requires_plain_array() {
        let spec = spec("BeatTrackerDegara", Category::Rhythm);
        let audio = AudioVector::from_samples(vec![0.0; 4], 44_100).unwrap();
        assert!(validate(&spec, &Input::Audio(audio)).is_err());
        assert!(validate(&spec, &Input::Samples(vec![0.0])).is_ok());
    }

    #[test]
    fn test_loader_requires_existing_file() {
        let spec = spec("MonoLoader", Category::Io);
        let err = validate(&spec, &Input::Path(PathBuf::from("/no/such.wav"))).unwrap_err();
        assert_eq!(err.error_code(), "INPUT_FILE_NOT_FOUND");

        let err = validate(&spec, &Input::Samples(vec![0.0])).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let file = NamedTempFile::new().unwrap();
        assert!(validate(&spec, &Input::from(file.path())).is_ok());
    }

    #[test]
    fn test_writer_requires_audio() {
        let spec = spec("MonoWriter", Category::Io);
        assert!(validate(&spec, &Input::Scalar(0.0)).is_err());
        assert!(validate(&spec, &Input::Samples(vec![0.1])).is_ok());
    }

    #[test]
    fn test_standard_accepts_everything() {
        let spec = spec("FrameCutter", Category::Standard);
        assert!(validate(&spec, &Input::Scalar(1.0)).is_ok());
        assert!(validate(&spec, &Input::Path(PathBuf::from("x"))).is_ok());
    }

    #[test]
    fn test_other_categories_reject_paths() {
        let spec = spec("Flatness", Category::Sfx);
        assert!(validate(&spec, &Input::Scalar(1.0)).is_ok());
        assert!(validate(&spec, &Input::Path(PathBuf::from("x"))).is_err());
    }

    #[test_case(Category::Spectral, 2048, 1024)]
    #[test_case(Category::Temporal, 512, 512)]
    #[test_case(Category::Tonal, 0, 1024)]
    #[test_case(Category::Stats, 4096, 16)]
    #[test_case(Category::Rhythm, 10, 256)]
    #[test_case(Category::Sfx, 300, 300)]
    fn test_output_capacity(category: Category, input_len: usize, expected: usize) {
        let spec = spec("Thing", category);
        let input = Input::Samples(vec![0.0; input_len]);
        assert_eq!(
            estimate_output_capacity(&spec, &input, &Parameters::new(), None),
            expected
        );
    }

    fn with(name: &str, value: i64) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert(name.to_string(), value.into());
        parameters
    }

    #[test]
    fn test_parameter_sized_outputs() {
        let input = Input::Samples(vec![0.0; 2048]);
        let mfcc = spec("MFCC", Category::Spectral);
        assert_eq!(estimate_output_capacity(&mfcc, &input, &Parameters::new(), None), 13);
        assert_eq!(
            estimate_output_capacity(&mfcc, &input, &with("numberCoefficients", 20), None),
            20
        );
        assert_eq!(estimate_output_capacity(&mfcc, &input, &with("numCoeffs", 12), None), 12);

        let mel = spec("MelBands", Category::Spectral);
        assert_eq!(estimate_output_capacity(&mel, &input, &Parameters::new(), None), 24);
        assert_eq!(estimate_output_capacity(&mel, &input, &with("numberBands", 40), None), 40);

        let windowing = spec("Windowing", Category::Standard);
        assert_eq!(
            estimate_output_capacity(&windowing, &input, &Parameters::new(), None),
            2048
        );
        assert_eq!(
            estimate_output_capacity(&windowing, &input, &with("frameSize", 1024), None),
            1024
        );

        let fft = spec("FFT", Category::Standard);
        assert_eq!(estimate_output_capacity(&fft, &input, &with("size", 512), None), 1024);
    }

    #[test]
    fn test_unreadable_loader_source_starts_small() {
        let spec = spec("AudioLoader", Category::Io);
        let input = Input::Path(PathBuf::from("song.mp3"));
        assert_eq!(
            estimate_output_capacity(&spec, &input, &Parameters::new(), None),
            LOADER_INITIAL_CAPACITY
        );
    }

    fn stereo_wav(frames: u32, sample_rate: u32) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for _ in 0..frames * 2 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        file
    }

    #[test]
    fn test_loader_capacity_follows_source_header() {
        let file = stereo_wav(100, 8_000);
        let source = SourceInfo::read(file.path()).unwrap();
        assert_eq!(
            source,
            SourceInfo {
                sample_rate: 8_000,
                channels: 2,
                frames: 100
            }
        );

        let input = Input::from(file.path());
        let audio = spec("AudioLoader", Category::Io);
        let mono = spec("MonoLoader", Category::Io);
        assert_eq!(
            estimate_output_capacity(&audio, &input, &Parameters::new(), Some(source)),
            200
        );
        assert_eq!(
            estimate_output_capacity(&mono, &input, &with("sampleRate", 16_000), Some(source)),
            200
        );
        assert_eq!(
            estimate_output_capacity(&mono, &input, &with("sampleRate", 11_025), Some(source)),
            138
        );
    }

    #[test]
    fn test_source_info_rejects_non_wav() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a wav").unwrap();
        assert_eq!(SourceInfo::read(file.path()), None);
    }
}
