//! Generator configuration
//!
//! Built from defaults, then environment overrides, then command-line flags
//! (applied by the CLI layer).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::metadata::Category;
use crate::runtime::context::{DEFAULT_HEADER_PATHS, DEFAULT_LIBRARY_PATHS};
use crate::select::FilterCriteria;

/// Default output root for the generated tree
pub const DEFAULT_OUTPUT_DIR: &str = "generated";

/// Default interpreter used for introspection
pub const DEFAULT_TOOL_PATH: &str = "python3";

/// Default introspection timeout in seconds
pub const DEFAULT_INTROSPECTION_TIMEOUT_SECS: u64 = 60;

/// Environment variable overriding the introspection tool path
pub const ENV_TOOL_PATH: &str = "SIGBIND_PYTHON";

/// Environment variable overriding the introspection timeout
pub const ENV_INTROSPECTION_TIMEOUT: &str = "SIGBIND_INTROSPECTION_TIMEOUT_SECS";

/// Everything one generation run needs to know
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorConfig {
    pub output_dir: PathBuf,
    pub tool_path: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub categories: Vec<Category>,
    pub min_count: usize,
    pub dry_run: bool,
    pub force: bool,
    pub skip_introspection: bool,
    /// Extra header search roots; when empty the conventional install
    /// locations are scanned instead
    pub header_paths: Vec<PathBuf>,
    pub introspection_timeout_secs: u64,
    /// Shared-library fallback paths baked into the generated loader
    pub library_paths: Vec<PathBuf>,
    /// C-header fallback paths baked into the generated loader
    pub c_header_paths: Vec<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            tool_path: DEFAULT_TOOL_PATH.to_string(),
            include: Vec::new(),
            exclude: Vec::new(),
            categories: Vec::new(),
            min_count: 0,
            dry_run: false,
            force: false,
            skip_introspection: false,
            header_paths: Vec::new(),
            introspection_timeout_secs: DEFAULT_INTROSPECTION_TIMEOUT_SECS,
            library_paths: DEFAULT_LIBRARY_PATHS.iter().map(PathBuf::from).collect(),
            c_header_paths: DEFAULT_HEADER_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl GeneratorConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(tool) = env::var(ENV_TOOL_PATH) {
            if !tool.trim().is_empty() {
                config.tool_path = tool;
            }
        }

        config.introspection_timeout_secs = env::var(ENV_INTROSPECTION_TIMEOUT)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(config.introspection_timeout_secs);

        config
    }

    pub fn introspection_timeout(&self) -> Duration {
        Duration::from_secs(self.introspection_timeout_secs)
    }

    /// Compile the selection criteria carried by this config
    pub fn criteria(&self) -> Result<FilterCriteria> {
        FilterCriteria::new(
            &self.include,
            &self.exclude,
            self.categories.iter().copied(),
            self.min_count,
        )
    }
}
