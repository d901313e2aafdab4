//! Audio value container
//!
//! Raw mono (or interleaved) samples plus sample-rate/channel metadata.
//! Decoding, encoding and resampling go through an external ffmpeg-style
//! process; WAV is also read and written in-process with `hound`.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::process::Command;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use tempfile::NamedTempFile;

use super::utils::db_to_linear;
use crate::error::{Result, SigbindError};

/// Default sample rate for decoded audio
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Environment variable selecting the external decoder/encoder binary
pub const ENV_FFMPEG: &str = "SIGBIND_FFMPEG";

const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Little-endian raw PCM layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmFormat {
    F32Le,
    I16Le,
    I24Le,
    I32Le,
}

impl PcmFormat {
    /// Bytes per sample
    pub fn width(&self) -> usize {
        match self {
            PcmFormat::F32Le => 4,
            PcmFormat::I16Le => 2,
            PcmFormat::I24Le => 3,
            PcmFormat::I32Le => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PcmFormat::F32Le => "f32le",
            PcmFormat::I16Le => "i16le",
            PcmFormat::I24Le => "i24le",
            PcmFormat::I32Le => "i32le",
        }
    }
}

impl std::str::FromStr for PcmFormat {
    type Err = SigbindError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "f32le" => Ok(PcmFormat::F32Le),
            "i16le" | "s16le" => Ok(PcmFormat::I16Le),
            "i24le" | "s24le" => Ok(PcmFormat::I24Le),
            "i32le" | "s32le" => Ok(PcmFormat::I32Le),
            other => Err(SigbindError::InvalidPcm {
                reason: format!("unsupported PCM format: {}", other),
            }),
        }
    }
}

/// Container formats the external encoder can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Flac,
    Mp3,
    Ogg,
}

impl AudioFormat {
    fn codec(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "pcm_s16le",
            AudioFormat::Flac => "flac",
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::Ogg => "libvorbis",
        }
    }

    /// Format implied by a file extension, WAV when unknown
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("flac") => AudioFormat::Flac,
            Some("mp3") => AudioFormat::Mp3,
            Some("ogg") | Some("oga") => AudioFormat::Ogg,
            _ => AudioFormat::Wav,
        }
    }
}

/// Sample data with sample-rate and channel metadata
#[derive(Debug, Clone, PartialEq)]
pub struct AudioVector {
    data: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioVector {
    /// Wrap samples; empty data is rejected
    pub fn new(data: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if data.is_empty() {
            return Err(SigbindError::EmptyAudio);
        }
        Ok(Self {
            data,
            sample_rate,
            channels: channels.max(1),
        })
    }

    /// Mono samples at `sample_rate`
    pub fn from_samples(data: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(data, sample_rate, 1)
    }

    /// Decode any file the external decoder understands, resampled to
    /// `sample_rate` and downmixed to mono
    pub fn from_file(path: &Path, sample_rate: u32, channels: u16) -> Result<Self> {
        if !path.exists() {
            return Err(SigbindError::InputFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let channels = channels.max(1);
        let output = raw_tempfile()?;
        let mut command = ffmpeg();
        command
            .arg("-i")
            .arg(path)
            .args(["-f", "f32le", "-acodec", "pcm_f32le"])
            .arg("-ar")
            .arg(sample_rate.to_string())
            .arg("-ac")
            .arg(channels.to_string())
            .arg("-y")
            .arg(output.path());
        run(command)?;

        let raw = fs::read(output.path())?;
        let data = unpack(&raw, PcmFormat::F32Le)?;
        Self::from_samples(downmix(&data, channels), sample_rate)
    }

    /// Read a WAV file in-process, downmixed to mono at its own sample rate
    pub fn from_wav(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SigbindError::InputFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let reader = WavReader::open(path).map_err(|e| SigbindError::Decoder {
            reason: format!("{}: {}", path.display(), e),
        })?;
        let spec = reader.spec();
        let samples = read_wav_samples(reader, spec)?;
        Self::from_samples(downmix(&samples, spec.channels), spec.sample_rate)
    }

    /// Decode raw little-endian mono PCM
    pub fn from_raw_pcm(raw: &[u8], sample_rate: u32, format: PcmFormat) -> Result<Self> {
        Self::from_interleaved_pcm(raw, sample_rate, 1, format)
    }

    /// Decode raw little-endian PCM with `channels` interleaved channels
    pub fn from_interleaved_pcm(
        raw: &[u8],
        sample_rate: u32,
        channels: u16,
        format: PcmFormat,
    ) -> Result<Self> {
        Self::new(unpack(raw, format)?, sample_rate, channels)
    }

    /// Encode as raw little-endian PCM
    pub fn to_raw_pcm(&self, format: PcmFormat) -> Vec<u8> {
        pack(&self.data, format)
    }

    /// Write a 32-bit float WAV file in-process
    pub fn save_wav(&self, path: &Path) -> Result<()> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let wav_error = |e: hound::Error| SigbindError::Decoder {
            reason: format!("{}: {}", path.display(), e),
        };

        let mut writer = WavWriter::create(path, spec).map_err(wav_error)?;
        for &sample in &self.data {
            writer.write_sample(sample).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)
    }

    /// Encode through the external encoder, format taken from the extension
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.save_as(path, AudioFormat::from_path(path))
    }

    pub fn save_as(&self, path: &Path, format: AudioFormat) -> Result<()> {
        let input = raw_tempfile()?;
        fs::write(input.path(), self.to_raw_pcm(PcmFormat::F32Le))?;

        let mut command = ffmpeg();
        command
            .args(["-f", "f32le", "-ar"])
            .arg(self.sample_rate.to_string())
            .arg("-ac")
            .arg(self.channels.to_string())
            .arg("-i")
            .arg(input.path())
            .args(["-c:a", format.codec(), "-y"])
            .arg(path);
        run(command)
    }

    /// Resample through the external process, keeping the channel layout;
    /// a no-op at the same rate
    pub fn resample(&self, sample_rate: u32) -> Result<Self> {
        if sample_rate == self.sample_rate {
            return Ok(self.clone());
        }

        let input = raw_tempfile()?;
        let output = raw_tempfile()?;
        fs::write(input.path(), self.to_raw_pcm(PcmFormat::F32Le))?;
        run(self.resample_command(sample_rate, input.path(), output.path()))?;

        let raw = fs::read(output.path())?;
        Self::from_interleaved_pcm(&raw, sample_rate, self.channels, PcmFormat::F32Le)
    }

    fn resample_command(&self, sample_rate: u32, input: &Path, output: &Path) -> Command {
        let channels = self.channels.to_string();
        let mut command = ffmpeg();
        command
            .args(["-f", "f32le", "-ar"])
            .arg(self.sample_rate.to_string())
            .args(["-ac", &channels, "-i"])
            .arg(input)
            .args(["-f", "f32le", "-ar"])
            .arg(sample_rate.to_string())
            .args(["-ac", &channels, "-y"])
            .arg(output);
        command
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of samples across all channels
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of interleaved frames
    pub fn frames(&self) -> usize {
        self.data.len() / usize::from(self.channels)
    }

    /// Duration in seconds; zero when the sample rate is unknown
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// `length` samples from `start`, clamped to the data
    pub fn slice(&self, start: usize, length: usize) -> Result<Self> {
        let start = start.min(self.data.len());
        let end = start.saturating_add(length).min(self.data.len());
        Self::new(self.data[start..end].to_vec(), self.sample_rate, self.channels)
    }

    /// Whole frames between the two times
    pub fn slice_time(&self, start_seconds: f64, duration_seconds: f64) -> Result<Self> {
        let rate = self.sample_rate as f64;
        let channels = usize::from(self.channels);
        let start = (start_seconds.max(0.0) * rate) as usize * channels;
        let length = (duration_seconds.max(0.0) * rate) as usize * channels;
        self.slice(start, length)
    }

    /// Scale so the largest magnitude is 1.0; silent data is unchanged
    pub fn normalize(&self) -> Self {
        let peak = self.data.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        if peak <= 0.0 {
            return self.clone();
        }
        self.map(|s| s / peak)
    }

    /// Apply a gain in decibels
    pub fn apply_gain(&self, gain_db: f32) -> Self {
        let gain = db_to_linear(gain_db);
        self.map(|s| s * gain)
    }

    /// Linear fade in and fade out, in seconds; every channel of a frame
    /// gets the same gain
    pub fn apply_fade(&self, fade_in_seconds: f64, fade_out_seconds: f64) -> Self {
        let mut data = self.data.clone();
        let channels = usize::from(self.channels);
        let frames = data.len() / channels;
        let rate = self.sample_rate as f64;
        let fade_in = (fade_in_seconds.max(0.0) * rate) as usize;
        let fade_out = (fade_out_seconds.max(0.0) * rate) as usize;

        let mut frame_gain = |frame: usize, gain: f32| {
            for sample in &mut data[frame * channels..(frame + 1) * channels] {
                *sample *= gain;
            }
        };
        for i in 0..fade_in.min(frames) {
            frame_gain(i, i as f32 / fade_in as f32);
        }
        for i in 0..fade_out.min(frames) {
            frame_gain(frames - 1 - i, i as f32 / fade_out as f32);
        }

        Self {
            data,
            ..self.clone()
        }
    }

    /// Average interleaved channels into one
    pub fn to_mono(&self) -> Self {
        Self {
            data: downmix(&self.data, self.channels),
            sample_rate: self.sample_rate,
            channels: 1,
        }
    }

    fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            data: self.data.iter().map(|&s| f(s)).collect(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

impl fmt::Display for AudioVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioVector(length={}, sampleRate={}, channels={}, duration={:.2}s)",
            self.len(),
            self.sample_rate,
            self.channels,
            self.duration()
        )
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Average each frame of interleaved `channels`-channel data
pub fn downmix(data: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return data.to_vec();
    }
    data.chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn unpack(raw: &[u8], format: PcmFormat) -> Result<Vec<f32>> {
    let width = format.width();
    if raw.len() % width != 0 {
        return Err(SigbindError::InvalidPcm {
            reason: format!(
                "{} bytes is not a multiple of the {} sample width {}",
                raw.len(),
                format.as_str(),
                width
            ),
        });
    }

    let samples = raw.chunks_exact(width).map(|b| match format {
        PcmFormat::F32Le => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        PcmFormat::I16Le => i16::from_le_bytes([b[0], b[1]]) as f32 / 32_768.0,
        PcmFormat::I24Le => {
            // Sign-extend through the top byte of an i32
            let value = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
            value as f32 / 8_388_608.0
        }
        PcmFormat::I32Le => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32 / 2_147_483_648.0,
    });
    Ok(samples.collect())
}

fn pack(data: &[f32], format: PcmFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * format.width());
    for &sample in data {
        match format {
            PcmFormat::F32Le => out.extend_from_slice(&sample.to_le_bytes()),
            PcmFormat::I16Le => {
                let v = (sample * 32_767.0).round().clamp(-32_768.0, 32_767.0) as i16;
                out.extend_from_slice(&v.to_le_bytes());
            }
            PcmFormat::I24Le => {
                let v = (sample * 8_388_607.0).round().clamp(-8_388_608.0, 8_388_607.0) as i32;
                out.extend_from_slice(&v.to_le_bytes()[..3]);
            }
            PcmFormat::I32Le => {
                let v = (sample as f64 * 2_147_483_647.0)
                    .round()
                    .clamp(-2_147_483_648.0, 2_147_483_647.0) as i32;
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
    out
}

fn read_wav_samples<R: std::io::Read>(reader: WavReader<R>, spec: WavSpec) -> Result<Vec<f32>> {
    let decode_error = |e: hound::Error| SigbindError::Decoder {
        reason: e.to_string(),
    };

    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_error),
        (SampleFormat::Int, bits @ 8..=32) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(decode_error)
        }
        (SampleFormat::Int, bits) => Err(SigbindError::Decoder {
            reason: format!("unsupported {}-bit integer WAV", bits),
        }),
    }
}

fn raw_tempfile() -> Result<NamedTempFile> {
    Ok(tempfile::Builder::new()
        .prefix("sigbind_audio_")
        .suffix(".raw")
        .tempfile()?)
}

/// The external decoder with banner and log noise suppressed
fn ffmpeg() -> Command {
    let binary = env::var(ENV_FFMPEG).unwrap_or_else(|_| DEFAULT_FFMPEG.to_string());
    let mut command = Command::new(binary);
    command.args(["-hide_banner", "-loglevel", "error"]);
    command
}

fn run(mut command: Command) -> Result<()> {
    debug!("Running {:?}", command);
    let output = command.output().map_err(|e| SigbindError::Decoder {
        reason: format!("failed to start {:?}: {}", command.get_program(), e),
    })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(SigbindError::Decoder {
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
