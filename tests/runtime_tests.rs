//! Runtime Tests
//!
//! Drives wrappers through the registry against the recording native API
//! and checks what crosses the boundary.

use std::sync::Arc;

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use sigbind::metadata::{Category, Mode};
use sigbind::runtime::mock::{Call, CallLog, RecordingApi};
use sigbind::runtime::{
    parameters_from_json, Algorithm, AlgorithmSpec, AudioVector, Input, NativeAlgorithm,
    NativeContext, Output, ParameterValue, Parameters, Registry,
};
use hound::{SampleFormat, WavSpec, WavWriter};
use serde_json::json;
use tempfile::NamedTempFile;

static SPECS: &[AlgorithmSpec] = &[
    AlgorithmSpec {
        name: "PitchYin",
        category: Category::Tonal,
        mode: Mode::Standard,
        valid_parameters: &["frameSize", "sampleRate", "tolerance"],
    },
    AlgorithmSpec {
        name: "Windowing",
        category: Category::Standard,
        mode: Mode::Standard,
        valid_parameters: &[],
    },
    AlgorithmSpec {
        name: "SpectralPeaks",
        category: Category::Spectral,
        mode: Mode::Standard,
        valid_parameters: &[],
    },
    AlgorithmSpec {
        name: "MonoLoader",
        category: Category::Io,
        mode: Mode::Standard,
        valid_parameters: &["filename", "sampleRate"],
    },
];

fn context(api: RecordingApi) -> (Arc<NativeContext>, CallLog) {
    let log = api.log();
    (Arc::new(NativeContext::from_api(api)), log)
}

#[test]
fn test_pitch_scenario_through_registry() {
    let api = RecordingApi::new().with_output("essentia_create_pitchyin", vec![220.0, 0.87]);
    let (ctx, log) = context(api);
    let registry = Registry::from_specs(SPECS);

    let parameters = parameters_from_json(&json!({"frameSize": 2048, "sampleRate": 44100}))
        .unwrap();
    let mut pitch = registry.create("PitchYin", ctx, parameters).unwrap();
    assert_eq!(pitch.category(), Category::Tonal);

    let output = pitch.compute(&Input::Samples(vec![0.0; 2048])).unwrap();
    assert_relative_eq!(output.real("pitch").unwrap(), 220.0);
    assert_relative_eq!(output.real("confidence").unwrap(), 0.87);

    let calls = log.calls();
    assert_eq!(calls[0], Call::Create("essentia_create_pitchyin".into()));
    assert!(calls.contains(&Call::SetInt {
        name: "frameSize".into(),
        value: 2048
    }));
    assert!(calls.contains(&Call::SetInt {
        name: "sampleRate".into(),
        value: 44100
    }));

    drop(pitch);
    assert_eq!(log.count(Call::is_destroy), 1);
}

#[test]
fn test_real_vector_parameter_keeps_order_and_count() {
    let (ctx, log) = context(RecordingApi::new());
    let registry = Registry::from_specs(SPECS);

    let mut parameters = Parameters::new();
    parameters.insert(
        "weights".to_string(),
        ParameterValue::RealVector(vec![0.5, 1.5, -2.25, 8.0]),
    );
    let mut windowing = registry.create("Windowing", ctx, parameters).unwrap();
    windowing.compute(&Input::Samples(vec![1.0; 4])).unwrap();

    assert_eq!(
        log.count(|c| *c
            == Call::SetRealVector {
                name: "weights".into(),
                values: vec![0.5, 1.5, -2.25, 8.0],
            }),
        1
    );
}

#[test]
fn test_unknown_name_and_parameter() {
    let (ctx, log) = context(RecordingApi::new());
    let registry = Registry::from_specs(SPECS);

    let err = registry
        .create("NoSuchThing", Arc::clone(&ctx), Parameters::new())
        .unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_ALGORITHM");

    let mut parameters = Parameters::new();
    parameters.insert("windowSize".to_string(), 4.into());
    let err = registry.create("PitchYin", ctx, parameters).unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_PARAMETER");
    assert!(log.is_empty());
}

#[test]
fn test_input_checked_before_handle_creation() {
    let (ctx, log) = context(RecordingApi::new());
    let registry = Registry::from_specs(SPECS);
    let mut pitch = registry.create("PitchYin", ctx, Parameters::new()).unwrap();

    let err = pitch
        .compute(&Input::Path("/tmp/song.wav".into()))
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_INPUT");
    assert!(log.is_empty());
}

#[test]
fn test_audio_vector_input_is_passed_through() {
    let api = RecordingApi::new().with_output(
        "essentia_create_spectralpeaks",
        vec![100.0, 200.0, 0.5, 0.25],
    );
    let (ctx, log) = context(api);
    let registry = Registry::from_specs(SPECS);
    let mut peaks = registry.create("SpectralPeaks", ctx, Parameters::new()).unwrap();

    let audio = AudioVector::from_samples(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8], 44_100)
        .unwrap();
    let output = peaks.compute(&Input::from(audio)).unwrap();

    assert_eq!(output.vector("frequencies"), Some(&[100.0, 200.0][..]));
    assert_eq!(output.vector("magnitudes"), Some(&[0.5, 0.25][..]));
    assert_eq!(
        log.calls()[1],
        Call::Compute {
            symbol: "essentia_create_spectralpeaks".into(),
            input: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8],
            capacity: 4,
        }
    );
}

#[test]
fn test_loader_pushes_filename_before_compute() {
    let file = NamedTempFile::new().unwrap();
    let api = RecordingApi::new().with_output("essentia_create_monoloader", vec![0.0, 0.5]);
    let (ctx, log) = context(api);
    let mut loader = NativeAlgorithm::new(SPECS[3], ctx, Parameters::new())
        .unwrap()
        .with_output_capacity(8);

    let raw = loader.compute_raw(&Input::from(file.path())).unwrap();
    assert_eq!(raw, vec![0.0, 0.5]);

    let calls = log.calls();
    assert_eq!(
        calls[1],
        Call::SetString {
            name: "filename".into(),
            value: file.path().to_string_lossy().into_owned(),
        }
    );
    assert!(calls[2].is_compute());
}

#[test]
fn test_loader_missing_file() {
    let (ctx, log) = context(RecordingApi::new());
    let mut loader = NativeAlgorithm::new(SPECS[3], ctx, Parameters::new()).unwrap();
    let err = loader
        .compute(&Input::Path("/definitely/not/here.wav".into()))
        .unwrap_err();
    assert_eq!(err.error_code(), "INPUT_FILE_NOT_FOUND");
    assert!(log.is_empty());
}

#[test]
fn test_by_category_builds_one_instance_each() {
    let (ctx, log) = context(RecordingApi::new());
    let registry = Registry::from_specs(SPECS);

    let grouped = registry.by_category(&ctx);
    assert_eq!(grouped[&Category::Tonal].len(), 1);
    assert_eq!(grouped[&Category::Io][0].name(), "MonoLoader");
    assert_eq!(grouped.values().map(Vec::len).sum::<usize>(), SPECS.len());

    // Construction alone never reaches the native side
    drop(grouped);
    assert!(log.is_empty());
}

fn fixed_pitch(ctx: Arc<NativeContext>, parameters: Parameters) -> sigbind::Result<Box<dyn Algorithm>> {
    Ok(Box::new(
        NativeAlgorithm::new(SPECS[0], ctx, parameters)?.with_output_capacity(2),
    ))
}

#[test]
fn test_custom_constructor_replaces_generic_entry() {
    let api = RecordingApi::new().with_output("essentia_create_pitchyin", vec![440.0, 0.5]);
    let (ctx, log) = context(api);
    let mut registry = Registry::from_specs(SPECS);
    registry.register("PitchYin", Category::Tonal, fixed_pitch);
    assert_eq!(registry.len(), SPECS.len());

    let mut pitch = registry.create("PitchYin", ctx, Parameters::new()).unwrap();
    let output = pitch.compute(&Input::Samples(vec![0.0; 1024])).unwrap();
    assert!(matches!(output, Output::Fields(_)));
    assert_relative_eq!(output.real("pitch").unwrap(), 440.0);
    assert_eq!(
        log.count(|c| matches!(c, Call::Compute { capacity: 2, .. })),
        1
    );
}

static AUDIO_LOADER: AlgorithmSpec = AlgorithmSpec {
    name: "AudioLoader",
    category: Category::Io,
    mode: Mode::Standard,
    valid_parameters: &["filename", "computeMD5", "sampleRate"],
};

#[test]
fn test_audio_loader_sized_and_shaped_from_wav_header() {
    let file = NamedTempFile::new().unwrap();
    let spec = WavSpec {
        channels: 2,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(file.path(), spec).unwrap();
    for _ in 0..16 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    let api = RecordingApi::new().with_output("essentia_create_audioloader", vec![0.5, -0.5]);
    let (ctx, log) = context(api);
    let mut loader = NativeAlgorithm::new(AUDIO_LOADER, ctx, Parameters::new()).unwrap();
    let output = loader.compute(&Input::from(file.path())).unwrap();

    assert_eq!(output.vector("audio"), Some(&[0.5, -0.5][..]));
    assert_relative_eq!(output.real("sampleRate").unwrap(), 8_000.0);
    assert_relative_eq!(output.real("channels").unwrap(), 2.0);
    // Eight stereo frames
    assert_eq!(
        log.count(|c| matches!(c, Call::Compute { capacity: 16, .. })),
        1
    );
}

#[test]
fn test_parameter_sized_mfcc_buffer() {
    static MFCC: AlgorithmSpec = AlgorithmSpec {
        name: "MFCC",
        category: Category::Spectral,
        mode: Mode::Standard,
        valid_parameters: &[],
    };
    let (ctx, log) = context(RecordingApi::new().with_output("essentia_create_mfcc", vec![1.0; 20]));
    let parameters = parameters_from_json(&json!({"numberCoefficients": 20})).unwrap();
    let mut mfcc = NativeAlgorithm::new(MFCC, ctx, parameters).unwrap();

    let output = mfcc.compute(&Input::Samples(vec![0.0; 1025])).unwrap();
    assert_eq!(output.vector("coefficients").map(<[f32]>::len), Some(20));
    assert_eq!(
        log.count(|c| matches!(c, Call::Compute { capacity: 20, .. })),
        1
    );
}
