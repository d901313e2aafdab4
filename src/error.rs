//! Error handling for sigbind
//!
//! Every failure is classified into one of four domain kinds. Discovery
//! errors are recovered by the generator, configuration and algorithm errors
//! are fatal to a single wrapper call, and generation errors are fatal to the
//! generation run.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for sigbind operations
pub type Result<T> = std::result::Result<T, SigbindError>;

/// Coarse classification of a [`SigbindError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Introspection process failure, degrades to header-only discovery
    Discovery,
    /// Unknown parameter, unsupported parameter type, bad algorithm lookup
    Configuration,
    /// Input-shape violation or native execution failure
    Algorithm,
    /// Unwritable output or malformed template input
    Generation,
    /// Plain I/O failure outside the categories above
    Io,
    /// JSON (de)serialization failure
    Serialization,
}

/// Main error type for sigbind operations
#[derive(Error, Debug)]
pub enum SigbindError {
    // Discovery Errors
    #[error("Introspection failed: {reason}")]
    IntrospectionFailed { reason: String },

    #[error("Introspection timed out after {timeout_secs}s")]
    IntrospectionTimeout { timeout_secs: u64 },

    #[error("Malformed introspection payload: {reason}")]
    MalformedIntrospection { reason: String },

    // Configuration Errors
    #[error("Invalid parameter '{parameter}' for {algorithm}")]
    UnknownParameter { algorithm: String, parameter: String },

    #[error("Unsupported parameter type for '{parameter}': {found}")]
    UnsupportedParameterType { parameter: String, found: String },

    #[error("Invalid value for parameter '{parameter}': {reason}")]
    InvalidParameterValue { parameter: String, reason: String },

    #[error("Unknown algorithm: {name}")]
    UnknownAlgorithm { name: String },

    #[error("Native library not found (searched {searched:?})")]
    LibraryNotFound { searched: Vec<PathBuf> },

    #[error("Native C header not found (searched {searched:?})")]
    HeaderNotFound { searched: Vec<PathBuf> },

    #[error("Failed to load native library {path}: {reason}")]
    LibraryLoad { path: PathBuf, reason: String },

    #[error("Native symbol not available: {symbol}")]
    SymbolNotFound { symbol: String },

    // Algorithm Errors
    #[error("{algorithm} expects {expected} input")]
    InvalidInput { algorithm: String, expected: String },

    #[error("Audio file not found: {path}")]
    InputFileNotFound { path: PathBuf },

    #[error("Failed to create {algorithm} algorithm instance")]
    HandleCreation { algorithm: String },

    #[error("{algorithm} execution failed with code: {code}")]
    NativeFailure { algorithm: String, code: i32 },

    #[error("{algorithm} produced {produced} values but the output buffer holds {capacity}")]
    OutputOverflow {
        algorithm: String,
        produced: usize,
        capacity: usize,
    },

    #[error("Algorithm handle for {algorithm} used after destruction")]
    HandleDestroyed { algorithm: String },

    #[error("Audio data cannot be empty")]
    EmptyAudio,

    #[error("Invalid PCM data: {reason}")]
    InvalidPcm { reason: String },

    #[error("External decoder failed: {reason}")]
    Decoder { reason: String },

    // Generation Errors
    #[error("Cannot write output path {path}: {source}")]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed template input: {reason}")]
    InvalidTemplateInput { reason: String },

    #[error("Invalid filter pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SigbindError {
    /// Domain kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SigbindError::IntrospectionFailed { .. }
            | SigbindError::IntrospectionTimeout { .. }
            | SigbindError::MalformedIntrospection { .. } => ErrorKind::Discovery,

            SigbindError::UnknownParameter { .. }
            | SigbindError::UnsupportedParameterType { .. }
            | SigbindError::InvalidParameterValue { .. }
            | SigbindError::UnknownAlgorithm { .. }
            | SigbindError::LibraryNotFound { .. }
            | SigbindError::HeaderNotFound { .. }
            | SigbindError::LibraryLoad { .. }
            | SigbindError::SymbolNotFound { .. } => ErrorKind::Configuration,

            SigbindError::InvalidInput { .. }
            | SigbindError::InputFileNotFound { .. }
            | SigbindError::HandleCreation { .. }
            | SigbindError::NativeFailure { .. }
            | SigbindError::OutputOverflow { .. }
            | SigbindError::HandleDestroyed { .. }
            | SigbindError::EmptyAudio
            | SigbindError::InvalidPcm { .. }
            | SigbindError::Decoder { .. } => ErrorKind::Algorithm,

            SigbindError::OutputNotWritable { .. }
            | SigbindError::InvalidTemplateInput { .. }
            | SigbindError::InvalidPattern { .. } => ErrorKind::Generation,

            SigbindError::Io(_) => ErrorKind::Io,
            SigbindError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SigbindError::IntrospectionFailed { .. } => "INTROSPECTION_FAILED",
            SigbindError::IntrospectionTimeout { .. } => "INTROSPECTION_TIMEOUT",
            SigbindError::MalformedIntrospection { .. } => "MALFORMED_INTROSPECTION",
            SigbindError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            SigbindError::UnsupportedParameterType { .. } => "UNSUPPORTED_PARAMETER_TYPE",
            SigbindError::InvalidParameterValue { .. } => "INVALID_PARAMETER_VALUE",
            SigbindError::UnknownAlgorithm { .. } => "UNKNOWN_ALGORITHM",
            SigbindError::LibraryNotFound { .. } => "LIBRARY_NOT_FOUND",
            SigbindError::HeaderNotFound { .. } => "HEADER_NOT_FOUND",
            SigbindError::LibraryLoad { .. } => "LIBRARY_LOAD",
            SigbindError::SymbolNotFound { .. } => "SYMBOL_NOT_FOUND",
            SigbindError::InvalidInput { .. } => "INVALID_INPUT",
            SigbindError::InputFileNotFound { .. } => "INPUT_FILE_NOT_FOUND",
            SigbindError::HandleCreation { .. } => "HANDLE_CREATION",
            SigbindError::NativeFailure { .. } => "NATIVE_FAILURE",
            SigbindError::OutputOverflow { .. } => "OUTPUT_OVERFLOW",
            SigbindError::HandleDestroyed { .. } => "HANDLE_DESTROYED",
            SigbindError::EmptyAudio => "EMPTY_AUDIO",
            SigbindError::InvalidPcm { .. } => "INVALID_PCM",
            SigbindError::Decoder { .. } => "DECODER_ERROR",
            SigbindError::OutputNotWritable { .. } => "OUTPUT_NOT_WRITABLE",
            SigbindError::InvalidTemplateInput { .. } => "INVALID_TEMPLATE_INPUT",
            SigbindError::InvalidPattern { .. } => "INVALID_PATTERN",
            SigbindError::Io(_) => "IO_ERROR",
            SigbindError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can carry on after this error
    ///
    /// Discovery failures degrade to a narrower discovery; configuration and
    /// algorithm failures only affect the single call that raised them.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::Generation | ErrorKind::Io | ErrorKind::Serialization
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SigbindError::UnknownAlgorithm {
            name: "Nope".to_string(),
        };
        assert_eq!(err.error_code(), "UNKNOWN_ALGORITHM");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_discovery_errors_are_recoverable() {
        let err = SigbindError::IntrospectionTimeout { timeout_secs: 5 };
        assert_eq!(err.kind(), ErrorKind::Discovery);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_generation_errors_are_fatal() {
        let err = SigbindError::InvalidTemplateInput {
            reason: "unresolved placeholder".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Generation);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_native_failure_message() {
        let err = SigbindError::NativeFailure {
            algorithm: "PitchYin".to_string(),
            code: -3,
        };
        assert_eq!(err.to_string(), "PitchYin execution failed with code: -3");
    }
}
