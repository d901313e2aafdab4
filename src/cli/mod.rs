//! CLI Module
//!
//! Command-line surface of the binding generator.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::GeneratorConfig;
use crate::metadata::Category;

/// sigbind - binding generator for a native signal-processing library
#[derive(Parser, Debug)]
#[command(name = "sigbind")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover, select and generate wrapper modules
    #[command(name = "generate")]
    Generate(GenerateArgs),

    /// Print the merged metadata table as JSON
    #[command(name = "discover")]
    Discover(DiscoverArgs),

    /// Print the category assigned to each name
    #[command(name = "classify")]
    Classify {
        /// Algorithm names
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// Options shared by every command that runs discovery
#[derive(Args, Debug, Clone, Default)]
pub struct DiscoverArgs {
    /// Interpreter used for introspection
    #[arg(long = "python", value_name = "PATH")]
    pub tool_path: Option<String>,

    /// Header-scan only
    #[arg(long)]
    pub skip_introspection: bool,

    /// Extra header search root (repeatable)
    #[arg(long = "header-path", value_name = "DIR")]
    pub header_paths: Vec<PathBuf>,

    /// Introspection timeout in seconds
    #[arg(long = "timeout-secs", value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Output directory for the generated tree
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub discovery: DiscoverArgs,

    /// Keep only names matching this glob (repeatable, case-insensitive)
    #[arg(long, value_name = "GLOB")]
    pub include: Vec<String>,

    /// Drop names matching this glob (repeatable, case-insensitive)
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Keep only this category (repeatable)
    #[arg(long = "category", value_name = "CATEGORY")]
    pub categories: Vec<Category>,

    /// Drop categories with fewer selected algorithms than this
    #[arg(long, default_value_t = 0)]
    pub min_count: usize,

    /// List planned files without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,

    /// Shared-library fallback path baked into the loader (repeatable)
    #[arg(long = "library-path", value_name = "FILE")]
    pub library_paths: Vec<PathBuf>,

    /// C-header fallback path baked into the loader (repeatable)
    #[arg(long = "c-header", value_name = "FILE")]
    pub c_header_paths: Vec<PathBuf>,
}

impl DiscoverArgs {
    /// Layer these options over `config`
    pub fn apply(&self, config: &mut GeneratorConfig) {
        if let Some(tool) = &self.tool_path {
            config.tool_path = tool.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.introspection_timeout_secs = secs;
        }
        config.skip_introspection |= self.skip_introspection;
        config.header_paths.extend(self.header_paths.iter().cloned());
    }
}

impl GenerateArgs {
    /// Environment-derived defaults with these options applied
    pub fn to_config(&self) -> GeneratorConfig {
        let mut config = GeneratorConfig::from_env();
        self.discovery.apply(&mut config);

        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        config.include = self.include.clone();
        config.exclude = self.exclude.clone();
        config.categories = self.categories.clone();
        config.min_count = self.min_count;
        config.dry_run = self.dry_run;
        config.force = self.force;

        // Explicit paths go ahead of the built-in fallbacks
        if !self.library_paths.is_empty() {
            let mut paths = self.library_paths.clone();
            paths.append(&mut config.library_paths);
            config.library_paths = paths;
        }
        if !self.c_header_paths.is_empty() {
            let mut paths = self.c_header_paths.clone();
            paths.append(&mut config.c_header_paths);
            config.c_header_paths = paths;
        }
        config
    }
}
