//! Parameter names accepted by well-known algorithms
//!
//! Generated wrappers embed the list for their algorithm. Algorithms missing
//! from the table, or listed with no names, accept any parameter.

const KNOWN_PARAMETERS: &[(&str, &[&str])] = &[
    // I/O
    ("AudioLoader", &["filename", "computeMD5", "sampleRate"]),
    ("MonoLoader", &["filename", "sampleRate", "downmix"]),
    ("EasyLoader", &["filename", "sampleRate", "startTime", "endTime"]),
    ("AudioWriter", &["filename", "format", "sampleRate"]),
    ("MonoWriter", &["filename", "format", "sampleRate"]),
    // Audio problems
    (
        "StartStopCut",
        &["frameSize", "hopSize", "maximumStartTime", "maximumStopTime", "sampleRate", "threshold"],
    ),
    (
        "ClickDetector",
        &[
            "frameSize",
            "hopSize",
            "order",
            "powerEstimationThreshold",
            "detectionThreshold",
            "silenceThreshold",
        ],
    ),
    (
        "DiscontinuityDetector",
        &["frameSize", "hopSize", "detectionThreshold", "energy_threshold", "kernel_size", "order"],
    ),
    ("FalseStereoDetector", &["frameSize", "hopSize", "correlationThreshold"]),
    ("GapsDetector", &["frameSize", "hopSize", "silenceThreshold", "minimumGapLength"]),
    ("HumDetector", &["frameSize", "hopSize", "minimumDuration", "tolerance", "sampleRate"]),
    (
        "SaturationDetector",
        &["frameSize", "hopSize", "differentialThreshold", "energyThreshold", "minimumDuration"],
    ),
    ("SNR", &["frameSize", "noiseThreshold", "useBroadbandNoise"]),
    // Spectral
    (
        "MFCC",
        &[
            "numCoeffs",
            "sampleRate",
            "numberBands",
            "lowFrequencyBound",
            "highFrequencyBound",
            "inputSize",
            "type",
            "weighting",
            "warpingFormula",
            "logType",
            "normalize",
            "dctType",
            "liftering",
        ],
    ),
    ("SpectralCentroid", &["sampleRate"]),
    ("SpectralRolloff", &["sampleRate", "cutoff"]),
    ("SpectralFlux", &["sampleRate", "halfRectify"]),
    (
        "SpectralContrast",
        &[
            "sampleRate",
            "frameSize",
            "numberBands",
            "lowFrequencyBound",
            "highFrequencyBound",
            "neighbourRatio",
            "staticDistribution",
        ],
    ),
    (
        "MelBands",
        &[
            "sampleRate",
            "inputSize",
            "numberBands",
            "lowFrequencyBound",
            "highFrequencyBound",
            "warpingFormula",
            "weighting",
            "normalize",
            "type",
            "log",
        ],
    ),
    ("BarkBands", &["sampleRate", "inputSize", "numberBands", "normalize"]),
    (
        "ERBBands",
        &[
            "sampleRate",
            "inputSize",
            "numberBands",
            "lowFrequencyBound",
            "highFrequencyBound",
            "normalize",
            "type",
            "width",
        ],
    ),
    (
        "SpectralPeaks",
        &[
            "sampleRate",
            "threshold",
            "minFrequency",
            "maxFrequency",
            "maxPeaks",
            "interpolate",
            "magnitudeThreshold",
            "orderBy",
        ],
    ),
    ("FFT", &["size"]),
    ("IFFT", &["size"]),
    ("Spectrum", &["size"]),
    ("PowerSpectrum", &["size"]),
    // Temporal
    ("DynamicComplexity", &["frameSize", "sampleRate"]),
    ("Energy", &[]),
    ("EnergyBand", &["sampleRate", "startCutoffFrequency", "stopCutoffFrequency"]),
    ("EnergyBandRatio", &["sampleRate", "startFrequency", "stopFrequency"]),
    ("Envelope", &["applyRectification", "attackTime", "releaseTime", "sampleRate"]),
    ("InstantPower", &[]),
    ("Intensity", &["sampleRate"]),
    ("Larm", &["attackTime", "power", "releaseTime", "sampleRate"]),
    ("Leq", &[]),
    ("Loudness", &[]),
    ("LoudnessEBUR128", &["hopSize", "sampleRate", "startAtZero"]),
    ("LoudnessVickers", &["sampleRate"]),
    ("ReplayGain", &["sampleRate"]),
    ("RMS", &[]),
    ("ZeroCrossingRate", &["threshold"]),
    // Tonal
    (
        "PitchYin",
        &["frameSize", "sampleRate", "tolerance", "interpolate", "minFrequency", "maxFrequency"],
    ),
    (
        "PitchYinFFT",
        &["frameSize", "sampleRate", "tolerance", "interpolate", "minFrequency", "maxFrequency"],
    ),
    (
        "PitchYinProbabilistic",
        &["frameSize", "sampleRate", "tolerance", "lowRMS", "outputUnvoiced", "preciseTime"],
    ),
    (
        "Key",
        &["sampleRate", "numHarmonics", "slope", "profileType", "usePolyphony", "useThreeChords"],
    ),
    (
        "HPCP",
        &[
            "sampleRate",
            "minFrequency",
            "maxFrequency",
            "referenceFrequency",
            "nonLinear",
            "normalized",
            "size",
            "windowSize",
            "maxShifted",
            "splitFrequency",
            "harmonics",
            "bandPreset",
            "bandSplitFrequency",
            "weightType",
        ],
    ),
    (
        "Chromagram",
        &[
            "sampleRate",
            "minFrequency",
            "maxFrequency",
            "referenceFrequency",
            "binsPerOctave",
            "normalizeType",
            "threshold",
        ],
    ),
    // Rhythm
    ("RhythmExtractor", &["method", "minTempo", "maxTempo", "frameHop"]),
    ("RhythmExtractor2013", &["method", "minTempo", "maxTempo"]),
    ("BeatTrackerDegara", &["maxTempo", "minTempo"]),
    ("BeatTrackerMultiFeature", &["maxTempo", "minTempo"]),
    ("OnsetDetection", &["method", "sampleRate"]),
    ("OnsetDetectionGlobal", &["method", "sampleRate", "frameSize", "hopSize"]),
    (
        "TempoTap",
        &[
            "frameHop",
            "frameSize",
            "maxTempo",
            "minTempo",
            "numberFrames",
            "sampleRate",
            "tempoHints",
        ],
    ),
    (
        "Onsets",
        &["alpha", "delay", "frameRate", "maxTempo", "minTempo", "silenceThreshold"],
    ),
    // Filters
    ("BandPass", &["bandwidth", "cutoffFrequency", "sampleRate"]),
    ("BandReject", &["bandwidth", "cutoffFrequency", "sampleRate"]),
    ("HighPass", &["cutoffFrequency", "sampleRate"]),
    ("LowPass", &["cutoffFrequency", "sampleRate"]),
    ("AllPass", &["bandwidth", "cutoffFrequency", "sampleRate", "order"]),
    ("EqualLoudness", &["sampleRate"]),
    ("DCRemoval", &["cutoffFrequency", "sampleRate"]),
    ("IIR", &["numerator", "denominator"]),
    // Stats
    ("Mean", &[]),
    ("Variance", &[]),
    ("Centroid", &["range"]),
    ("CentralMoments", &["range", "mode"]),
    ("RawMoments", &["range", "mode"]),
    ("DistributionShape", &[]),
    ("Decrease", &["range"]),
    ("Flatness", &[]),
    ("Crest", &[]),
    ("Entropy", &[]),
    // Extractors
    ("LowLevelSpectralExtractor", &["frameSize", "hopSize", "sampleRate"]),
    ("TonalExtractor", &["frameSize", "hopSize", "sampleRate"]),
    ("RhythmDescriptors", &["frameSize", "hopSize", "sampleRate"]),
    ("FreesoundExtractor", &["frameSize", "hopSize", "sampleRate"]),
    // Machine learning inputs
    ("TensorflowInputMusiCNN", &["patchHopSize"]),
    ("TensorflowInputVGGish", &[]),
    ("TensorflowInputTempoCNN", &[]),
    ("TensorflowInputFSDSINet", &[]),
    // Synthesis
    (
        "SineModelAnal",
        &[
            "sampleRate",
            "maxnSines",
            "magnitudeThreshold",
            "minSineDur",
            "freqDevOffset",
            "freqDevSlope",
        ],
    ),
    ("SineModelSynth", &["sampleRate", "fftSize", "hopSize"]),
    (
        "HarmonicModelAnal",
        &[
            "sampleRate",
            "maxnSines",
            "magnitudeThreshold",
            "minSineDur",
            "nHarmonics",
            "harmThreshold",
        ],
    ),
    (
        "HprModelAnal",
        &[
            "sampleRate",
            "maxnSines",
            "magnitudeThreshold",
            "minSineDur",
            "nHarmonics",
            "harmThreshold",
            "freqDevOffset",
            "freqDevSlope",
        ],
    ),
    (
        "HpsModelAnal",
        &[
            "sampleRate",
            "maxnSines",
            "magnitudeThreshold",
            "minSineDur",
            "nHarmonics",
            "harmThreshold",
            "freqDevOffset",
            "freqDevSlope",
            "stocf",
        ],
    ),
    (
        "SprModelAnal",
        &[
            "sampleRate",
            "maxnSines",
            "magnitudeThreshold",
            "minSineDur",
            "freqDevOffset",
            "freqDevSlope",
            "stocf",
        ],
    ),
    (
        "SpsModelAnal",
        &[
            "sampleRate",
            "maxnSines",
            "magnitudeThreshold",
            "minSineDur",
            "freqDevOffset",
            "freqDevSlope",
            "stocf",
        ],
    ),
    // Standard
    (
        "FrameCutter",
        &["frameSize", "hopSize", "silentFrames", "startFromZero", "validFrameThresholdRatio"],
    ),
    ("Windowing", &["type", "size", "zeroPadding", "zeroPhase", "normalized"]),
    ("OverlapAdd", &["frameSize", "hopSize", "gain"]),
    ("Resample", &["inputSampleRate", "outputSampleRate", "quality"]),
    ("Scale", &["factor", "maxAbsValue", "clipping"]),
    ("UnaryOperator", &["type", "shift", "scale"]),
    ("BinaryOperator", &["type"]),
    ("Clipper", &["min", "max"]),
    ("NoiseAdder", &["level", "fixSeed"]),
];

/// Accepted parameter names for `algorithm`; empty when unrestricted
pub fn known_parameters(algorithm: &str) -> &'static [&'static str] {
    KNOWN_PARAMETERS
        .iter()
        .find(|(name, _)| *name == algorithm)
        .map(|(_, params)| *params)
        .unwrap_or(&[])
}

/// Render the list as a Rust slice literal body
pub fn parameter_list_literal(algorithm: &str) -> String {
    known_parameters(algorithm)
        .iter()
        .map(|p| format!("{:?}", p))
        .collect::<Vec<_>>()
        .join(", ")
}
