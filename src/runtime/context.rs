//! Process-wide native context
//!
//! A [`NativeContext`] owns one bound native library. Wrappers hold an
//! `Arc` to it, so the library stays loaded while any wrapper is alive and
//! is released with the last one.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use log::info;

use super::native::{DynamicLibrary, NativeApi};
use crate::error::{Result, SigbindError};

/// Shared-library locations tried after any configured path
pub const DEFAULT_LIBRARY_PATHS: &[&str] = &[
    "/usr/local/lib/libessentia.so",
    "/usr/lib/libessentia.so",
    "/usr/lib/x86_64-linux-gnu/libessentia.so",
    "/usr/lib/aarch64-linux-gnu/libessentia.so",
    "/opt/homebrew/lib/libessentia.dylib",
    "/usr/local/lib/libessentia.dylib",
];

/// C-header locations tried after any configured path
pub const DEFAULT_HEADER_PATHS: &[&str] = &[
    "/usr/local/include/essentia/essentia_c.h",
    "/usr/include/essentia/essentia_c.h",
    "/opt/homebrew/include/essentia/essentia_c.h",
];

/// Path list searched before the library fallbacks
pub const ENV_LIBRARY_PATH: &str = "SIGBIND_LIBRARY_PATH";

/// Path list searched before the header fallbacks
pub const ENV_HEADER_PATH: &str = "SIGBIND_HEADER_PATH";

static SHARED: Mutex<Weak<NativeContext>> = Mutex::new(Weak::new());

/// Ordered candidate locations for the library and its header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    pub libraries: Vec<PathBuf>,
    pub headers: Vec<PathBuf>,
}

impl Default for LibraryPaths {
    fn default() -> Self {
        Self {
            libraries: DEFAULT_LIBRARY_PATHS.iter().map(PathBuf::from).collect(),
            headers: DEFAULT_HEADER_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl LibraryPaths {
    pub fn new(libraries: Vec<PathBuf>, headers: Vec<PathBuf>) -> Self {
        Self { libraries, headers }
    }

    /// Prepend the entries of `SIGBIND_LIBRARY_PATH` / `SIGBIND_HEADER_PATH`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(list) = env::var_os(ENV_LIBRARY_PATH) {
            let mut libraries: Vec<PathBuf> = env::split_paths(&list).collect();
            libraries.append(&mut self.libraries);
            self.libraries = libraries;
        }
        if let Some(list) = env::var_os(ENV_HEADER_PATH) {
            let mut headers: Vec<PathBuf> = env::split_paths(&list).collect();
            headers.append(&mut self.headers);
            self.headers = headers;
        }
        self
    }

    /// First existing shared library
    pub fn locate_library(&self) -> Result<PathBuf> {
        first_existing(&self.libraries).ok_or_else(|| SigbindError::LibraryNotFound {
            searched: self.libraries.clone(),
        })
    }

    /// First existing C header
    pub fn locate_header(&self) -> Result<PathBuf> {
        first_existing(&self.headers).ok_or_else(|| SigbindError::HeaderNotFound {
            searched: self.headers.clone(),
        })
    }
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}

/// A bound native library
pub struct NativeContext {
    api: Box<dyn NativeApi>,
    library_path: Option<PathBuf>,
}

impl std::fmt::Debug for NativeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeContext")
            .field("library_path", &self.library_path)
            .finish()
    }
}

impl NativeContext {
    /// Locate and bind the library, failing fast when either the library or
    /// its header is missing
    pub fn load(paths: &LibraryPaths) -> Result<Self> {
        let library = paths.locate_library()?;
        let header = paths.locate_header()?;
        let api = DynamicLibrary::open(&library, &header)?;
        info!("Bound native library {}", library.display());
        Ok(Self {
            api: Box::new(api),
            library_path: Some(library),
        })
    }

    /// Wrap an already-bound API
    pub fn from_api(api: impl NativeApi + 'static) -> Self {
        Self {
            api: Box::new(api),
            library_path: None,
        }
    }

    /// The process-wide context, loading it on first use
    ///
    /// Returns the live instance while any `Arc` to it exists; once all are
    /// dropped the next call loads again.
    pub fn shared(paths: &LibraryPaths) -> Result<Arc<NativeContext>> {
        let mut slot = SHARED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(context) = slot.upgrade() {
            return Ok(context);
        }
        let context = Arc::new(Self::load(paths)?);
        *slot = Arc::downgrade(&context);
        Ok(context)
    }

    pub fn api(&self) -> &dyn NativeApi {
        self.api.as_ref()
    }

    pub fn library_path(&self) -> Option<&Path> {
        self.library_path.as_deref()
    }
}
