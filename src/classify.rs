//! Name-based algorithm classification
//!
//! Self-reported category information from the native library is not
//! trusted; every name is classified here instead. The rule table is ordered
//! and the first category with a matching substring wins, so table order is
//! the tie-break between overlapping patterns.

use crate::metadata::Category;

/// Ordered (category, substring patterns) table, tested against the
/// lower-cased name.
pub const CATEGORY_PATTERNS: &[(Category, &[&str])] = &[
    (
        Category::AudioProblems,
        &[
            "click", "gap", "silence", "noise", "burst", "hum", "saturation", "discontinuity",
            "falsestereo", "fade", "startstop", "truepeak",
        ],
    ),
    (
        Category::Complex,
        &["cartesian", "polar", "magnitude", "fftc", "ifftc"],
    ),
    (
        Category::Extractor,
        &[
            "musicextractor",
            "freesoundextractor",
            "levelextractor",
            "barkextractor",
            "lowlevelspectralextractor",
            "lowlevelspectraleqloudextractor",
            "tonalextractor",
            "rhythmextractor",
            "keyextractor",
            "tuningfrequencyextractor",
        ],
    ),
    (
        Category::Filters,
        &[
            "allpass", "bandpass", "bandreject", "highpass", "lowpass", "bpf", "iir",
            "dcremoval", "equalloudness", "maxfilter", "medianfilter", "movingaverage",
            "loudnessebur128filter",
        ],
    ),
    (
        Category::HighLevel,
        &[
            "danceability",
            "meter",
            "coversong",
            "similarity",
            "gaiatransform",
            "highlevelfeatures",
            "highresolutionfeatures",
        ],
    ),
    (
        Category::Io,
        &[
            "loader", "writer", "file", "audio", "mono", "eqloud", "easy", "metadatareader",
            "yamlinput", "yamloutput", "fileoutput", "vectorinput",
        ],
    ),
    (
        Category::MachineLearning,
        &[
            "tensorflow", "musicnn", "vggish", "fsdsinet", "svm", "pca", "gaia", "tensor",
            "pooltotensor", "tensortopool", "tensornormalize", "tensortranspose",
            "tensorflowinput", "vectorrealtotensor", "tensortovectorreal",
        ],
    ),
    (
        Category::Rhythm,
        &[
            "tempo", "beat", "rhythm", "onset", "bpm", "novelty", "beattracker", "tempotap",
            "rhythmextractor", "rhythmdescriptors", "rhythmtransform", "onsetdetection",
            "onsetrate", "beatsloudness", "singlebeatloudness", "temposcalebands",
            "percivalbpm", "danceability", "audioonsetsmarker", "chordsdetectionbeats",
            "tensorflowinputtempocnn", "harmonicbpm", "loopbpm", "bpmhistogram", "bpmrubato",
            "beatogram",
        ],
    ),
    (
        Category::Sfx,
        &[
            "derivative", "flatness", "crest", "decrease", "logattacktime", "strongdecay",
            "strongpeak", "tcto", "oddtoeven", "aftermaxto", "maxto", "minto",
            "derivativesfx", "flatnesssfx",
        ],
    ),
    (
        Category::Spectral,
        &[
            "spectral", "spectrum", "centroid", "rolloff", "flux", "mfcc", "bark", "mel", "fft",
            "ifft", "powerspectrum", "logspectrum", "triangularbark", "superflux",
            "spectralpeaks", "spectralwhitening", "spectralcontrast", "spectralcomplexity",
            "melbanks", "barkbands", "triangularbands", "hfc", "multipitch", "pitchcontours",
            "erbbands", "frequencybands", "bfcc", "gfcc", "constantq", "nsg", "welch",
            "spectrumcq", "spectrumtocent",
        ],
    ),
    (
        Category::Standard,
        &[
            "window", "windowing", "frame", "framecutter", "framebuffer", "frametoreal",
            "framegenerator", "resample", "resamplefft", "overlapadd", "clipper", "scale",
            "trimmer", "slicer", "stereotrimmer", "stereodemuxer", "stereomuxer", "monomixer",
            "panning", "noiseadder", "binary", "unary", "operator", "multiplexer", "duration",
            "effectiveduration",
        ],
    ),
    (
        Category::Stats,
        &[
            "mean", "variance", "median", "histogram", "distribution", "central", "raw",
            "moments", "geometricmean", "powermean", "minmax", "mintototal", "maxtototal",
            "entropy", "singlegaussian", "poolaggregator", "crosscorrelation",
            "autocorrelation", "crosssimilarity", "chromacrosssimilarity",
        ],
    ),
    (
        Category::Synthesis,
        &[
            "synthesis", "synth", "model", "anal", "sine", "stochastic", "spr", "sps", "hpr",
            "hps", "sinesubtraction", "lpc", "harmonicmodel", "sinemodel", "stochasticmodel",
        ],
    ),
    (
        Category::Temporal,
        &[
            "rms", "energy", "zero", "crossing", "envelope", "instantpower",
            "dynamiccomplexity", "intensity", "loudness", "vickers", "replaygain", "leq",
            "larm", "ebur128",
        ],
    ),
    (
        Category::Tonal,
        &[
            "chroma", "key", "chord", "pitch", "harmonic", "tonal", "chromagram",
            "chromaprinter", "chordsdetection", "chordsdescriptors", "harmonicmask",
            "harmonicpeaks", "inharmonicity", "nnlschroma", "pitchyin", "pitchsalience",
            "pitchfilter", "pitch2midi", "audio2pitch", "multipitklapuri", "tuningfrequency",
            "percivalenhanceharmonics", "pitchyinprobabilistic", "pitchyinprobabilities",
            "hpcp", "dissonance", "tristimulus", "vibrato", "tonicindianartmusic",
        ],
    ),
];

/// Classify an algorithm by name
///
/// Total and deterministic: every input yields a category, `Standard` when
/// neither the table nor the fallback rules match.
pub fn classify(name: &str) -> Category {
    let lower = name.to_lowercase();

    for (category, patterns) in CATEGORY_PATTERNS {
        if patterns.iter().any(|pattern| lower.contains(pattern)) {
            return *category;
        }
    }

    fallback(&lower).unwrap_or(Category::Standard)
}

/// Narrower suffix/substring rules applied after the table
fn fallback(lower: &str) -> Option<Category> {
    if lower.ends_with("descriptors") {
        Some(Category::Stats)
    } else if lower.ends_with("detector") || lower.ends_with("detection") {
        Some(Category::AudioProblems)
    } else if lower.contains("spline") || lower.contains("cubic") {
        Some(Category::Standard)
    } else if lower.contains("viterbi") || lower.contains("sbic") {
        Some(Category::MachineLearning)
    } else if lower.contains("peak") {
        Some(Category::Spectral)
    } else {
        None
    }
}
