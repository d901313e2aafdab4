//! Generated-tree planning and writing
//!
//! The generator turns a selection and its metadata into a Rust module tree:
//!
//! ```text
//! <root>/mod.rs, ffi.rs, base.rs, factory.rs
//! <root>/types/{mod.rs, audio_vector.rs}
//! <root>/exceptions/mod.rs
//! <root>/utils/{mod.rs, audio_utils.rs}
//! <root>/algorithms/mod.rs
//! <root>/algorithms/<category>/{mod.rs, <algorithm>.rs}
//! ```
//!
//! Planning is pure. Writing goes through a temp file in the target
//! directory and a rename, so a file is either fully written or untouched.

pub mod naming;
pub mod params;
pub mod template;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::config::GeneratorConfig;
use crate::error::{Result, SigbindError};
use crate::metadata::{AlgorithmMetadata, Category, Mode, MetadataTable};
use crate::select::SelectionSet;

pub use naming::{snake_case, validate_type_name};
pub use template::render;

/// One planned output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub path: PathBuf,
    pub contents: String,
    /// Replace an existing file at `path`
    pub overwrite: bool,
}

/// What happened to one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Created,
    Skipped,
    Overwritten,
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WriteOutcome::Created => "created",
            WriteOutcome::Skipped => "skipped",
            WriteOutcome::Overwritten => "overwritten",
        };
        f.write_str(label)
    }
}

/// A unit or entity that could not be generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationFailure {
    /// Algorithm name or file path
    pub subject: String,
    pub reason: String,
}

/// The full set of planned files for one run
#[derive(Debug, Clone, Default)]
pub struct GenerationPlan {
    pub units: Vec<GeneratedUnit>,
    /// Wrapper files grouped by category, for listing
    pub algorithms: BTreeMap<Category, Vec<PathBuf>>,
    pub failures: Vec<GenerationFailure>,
}

impl GenerationPlan {
    /// Planned support files (everything outside a category directory)
    pub fn support_files(&self) -> Vec<&Path> {
        let wrappers: BTreeSet<&Path> = self
            .algorithms
            .values()
            .flatten()
            .map(PathBuf::as_path)
            .collect();
        self.units
            .iter()
            .map(|unit| unit.path.as_path())
            .filter(|path| !wrappers.contains(path))
            .collect()
    }
}

/// Per-file outcomes of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub files: Vec<(PathBuf, WriteOutcome)>,
    pub failures: Vec<GenerationFailure>,
}

impl GenerationReport {
    fn count(&self, outcome: WriteOutcome) -> usize {
        self.files.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn created(&self) -> usize {
        self.count(WriteOutcome::Created)
    }

    pub fn skipped(&self) -> usize {
        self.count(WriteOutcome::Skipped)
    }

    pub fn overwritten(&self) -> usize {
        self.count(WriteOutcome::Overwritten)
    }

    /// Files actually written this run
    pub fn writes(&self) -> usize {
        self.created() + self.overwritten()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} created, {} overwritten, {} skipped, {} failed",
            self.created(),
            self.overwritten(),
            self.skipped(),
            self.failures.len()
        )
    }
}

/// Plans and writes the generated tree
#[derive(Debug, Clone)]
pub struct Generator {
    root: PathBuf,
    overwrite: bool,
    library_paths: Vec<PathBuf>,
    header_paths: Vec<PathBuf>,
}

impl Generator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = GeneratorConfig::default();
        Self {
            root: root.into(),
            overwrite: false,
            library_paths: defaults.library_paths,
            header_paths: defaults.c_header_paths,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            root: config.output_dir.clone(),
            overwrite: config.force,
            library_paths: config.library_paths.clone(),
            header_paths: config.c_header_paths.clone(),
        }
    }

    /// Replace existing files instead of skipping them
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render every file for `selection` without touching the filesystem
    ///
    /// An algorithm whose name cannot become a Rust item is recorded as a
    /// failure and left out of its category module and the factory; the
    /// rest of the selection is unaffected.
    pub fn plan(&self, selection: &SelectionSet, table: &MetadataTable) -> GenerationPlan {
        let mut plan = GenerationPlan::default();
        let mut accepted: BTreeMap<Category, Vec<(&AlgorithmMetadata, String)>> = BTreeMap::new();
        let mut module_names: BTreeSet<(Category, String)> = BTreeSet::new();

        for name in selection.iter() {
            let Some(meta) = table.get(name) else {
                plan.failures.push(GenerationFailure {
                    subject: name.to_string(),
                    reason: "selected but missing from the metadata table".to_string(),
                });
                continue;
            };

            let module = snake_case(&meta.name);
            let rendered = validate_type_name(&meta.name).and_then(|()| {
                if module_names.insert((meta.category, module.clone())) {
                    render_algorithm(meta)
                } else {
                    Err(SigbindError::InvalidTemplateInput {
                        reason: format!("module name {} is already taken", module),
                    })
                }
            });

            match rendered {
                Ok(contents) => {
                    let path = self
                        .root
                        .join("algorithms")
                        .join(meta.category.module_name())
                        .join(format!("{}.rs", module));
                    plan.algorithms
                        .entry(meta.category)
                        .or_default()
                        .push(path.clone());
                    plan.units.push(self.unit(path, contents));
                    accepted.entry(meta.category).or_default().push((meta, module));
                }
                Err(e) => {
                    warn!("Cannot generate {}: {}", meta.name, e);
                    plan.failures.push(GenerationFailure {
                        subject: meta.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        for (category, entries) in &accepted {
            let path = self
                .root
                .join("algorithms")
                .join(category.module_name())
                .join("mod.rs");
            self.push_rendered(&mut plan, path, render_category_module(*category, entries));
        }

        let categories: Vec<Category> = accepted.keys().copied().collect();
        self.push_rendered(
            &mut plan,
            self.root.join("algorithms").join("mod.rs"),
            render_algorithms_module(&categories),
        );
        self.push_rendered(&mut plan, self.root.join("factory.rs"), render_factory(&accepted));
        self.push_rendered(&mut plan, self.root.join("ffi.rs"), self.render_ffi());

        let fixed = [
            ("mod.rs", template::MOD_ROOT),
            ("base.rs", template::BASE),
            ("types/mod.rs", template::TYPES_MOD),
            ("types/audio_vector.rs", template::AUDIO_VECTOR),
            ("exceptions/mod.rs", template::EXCEPTIONS),
            ("utils/mod.rs", template::UTILS_MOD),
            ("utils/audio_utils.rs", template::AUDIO_UTILS),
        ];
        for (relative, contents) in fixed {
            plan.units.push(self.unit(self.root.join(relative), contents.to_string()));
        }

        plan
    }

    /// Plan and write the tree for `selection`
    ///
    /// Fails only if the output skeleton cannot be created; every other
    /// problem is recorded in the report and the run continues.
    pub fn generate(
        &self,
        selection: &SelectionSet,
        table: &MetadataTable,
    ) -> Result<GenerationReport> {
        let plan = self.plan(selection, table);
        self.create_skeleton(plan.algorithms.keys().copied())?;

        let mut report = GenerationReport {
            files: Vec::with_capacity(plan.units.len()),
            failures: plan.failures,
        };

        for unit in &plan.units {
            match write_unit(unit) {
                Ok(outcome) => {
                    match outcome {
                        WriteOutcome::Skipped => {
                            warn!("File exists, skipping: {}", unit.path.display())
                        }
                        _ => info!("{}: {}", outcome, unit.path.display()),
                    }
                    report.files.push((unit.path.clone(), outcome));
                }
                Err(e) => {
                    warn!("Failed to write {}: {}", unit.path.display(), e);
                    report.failures.push(GenerationFailure {
                        subject: unit.path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!("Generation finished: {}", report.summary());
        Ok(report)
    }

    fn create_skeleton(&self, categories: impl IntoIterator<Item = Category>) -> Result<()> {
        let algorithms = self.root.join("algorithms");
        let mut directories = vec![
            self.root.clone(),
            algorithms.clone(),
            self.root.join("types"),
            self.root.join("exceptions"),
            self.root.join("utils"),
        ];
        directories.extend(
            categories
                .into_iter()
                .map(|category| algorithms.join(category.module_name())),
        );

        for directory in directories {
            fs::create_dir_all(&directory).map_err(|e| SigbindError::OutputNotWritable {
                path: directory.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    fn unit(&self, path: PathBuf, contents: String) -> GeneratedUnit {
        GeneratedUnit {
            path,
            contents,
            overwrite: self.overwrite,
        }
    }

    fn push_rendered(&self, plan: &mut GenerationPlan, path: PathBuf, rendered: Result<String>) {
        match rendered {
            Ok(contents) => plan.units.push(self.unit(path, contents)),
            Err(e) => plan.failures.push(GenerationFailure {
                subject: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn render_ffi(&self) -> Result<String> {
        let library_paths = path_list_literal(&self.library_paths);
        let header_paths = path_list_literal(&self.header_paths);
        template::render(
            template::FFI,
            &[("LIBRARY_PATHS", &library_paths), ("HEADER_PATHS", &header_paths)],
        )
    }
}

/// Write one unit, honouring its overwrite policy
pub fn write_unit(unit: &GeneratedUnit) -> Result<WriteOutcome> {
    let existed = unit.path.exists();
    if existed && !unit.overwrite {
        return Ok(WriteOutcome::Skipped);
    }

    let not_writable = |source| SigbindError::OutputNotWritable {
        path: unit.path.clone(),
        source,
    };
    let parent = unit
        .path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(not_writable)?;

    let mut file = NamedTempFile::new_in(parent).map_err(not_writable)?;
    file.write_all(unit.contents.as_bytes()).map_err(not_writable)?;
    if !commit(file, &unit.path, unit.overwrite).map_err(not_writable)? {
        debug!("{} appeared while writing, leaving it", unit.path.display());
        return Ok(WriteOutcome::Skipped);
    }
    debug!("Wrote {} bytes to {}", unit.contents.len(), unit.path.display());

    Ok(if existed {
        WriteOutcome::Overwritten
    } else {
        WriteOutcome::Created
    })
}

/// Move a finished temp file into place
///
/// Without `overwrite` the rename refuses to replace a file, so one created
/// after the existence check is kept. Returns whether `file` was placed.
fn commit(file: NamedTempFile, path: &Path, overwrite: bool) -> io::Result<bool> {
    if overwrite {
        file.persist(path).map_err(|e| e.error)?;
        return Ok(true);
    }
    match file.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

fn path_list_literal(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("    {:?},", p.to_string_lossy()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn mode_variant(mode: Mode) -> &'static str {
    match mode {
        Mode::Standard => "Standard",
        Mode::Streaming => "Streaming",
    }
}

fn render_algorithm(meta: &AlgorithmMetadata) -> Result<String> {
    let fallback = format!("Wrapper for the native {} algorithm.", meta.name);
    let description = meta
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(&fallback);
    let valid_parameters = params::parameter_list_literal(&meta.name);

    template::render(
        template::ALGORITHM,
        &[
            ("NAME", &meta.name),
            ("CATEGORY", meta.category.as_str()),
            ("MODE", meta.mode.as_str()),
            ("MODE_VARIANT", mode_variant(meta.mode)),
            ("DESCRIPTION", &template::doc_lines(description)),
            ("VALID_PARAMETERS", &valid_parameters),
        ],
    )
}

fn render_category_module(
    category: Category,
    entries: &[(&AlgorithmMetadata, String)],
) -> Result<String> {
    let modules = entries
        .iter()
        .map(|(_, module)| format!("pub mod {};", module))
        .collect::<Vec<_>>()
        .join("\n");
    let exports = entries
        .iter()
        .map(|(meta, module)| format!("pub use {}::{};", module, meta.name))
        .collect::<Vec<_>>()
        .join("\n");

    template::render(
        template::CATEGORY_MOD,
        &[
            ("CATEGORY", category.as_str()),
            ("ALGORITHM_MODULES", &modules),
            ("ALGORITHM_EXPORTS", &exports),
        ],
    )
}

fn render_algorithms_module(categories: &[Category]) -> Result<String> {
    let modules = categories
        .iter()
        .map(|category| format!("pub mod {};", category.module_name()))
        .collect::<Vec<_>>()
        .join("\n");
    template::render(template::ALGORITHMS_MOD, &[("CATEGORY_MODULES", &modules)])
}

fn render_factory(
    accepted: &BTreeMap<Category, Vec<(&AlgorithmMetadata, String)>>,
) -> Result<String> {
    let mut entries: Vec<(&str, String)> = accepted
        .iter()
        .flat_map(|(category, list)| {
            list.iter().map(move |(meta, module)| {
                let path = format!("algorithms::{}::{}", category.module_name(), module);
                let line = format!("    ({}::SPEC, {}::{}::boxed),", path, path, meta.name);
                (meta.name.as_str(), line)
            })
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let lines = entries
        .into_iter()
        .map(|(_, line)| line)
        .collect::<Vec<_>>()
        .join("\n");
    template::render(template::FACTORY, &[("ALGORITHM_ENTRIES", &lines)])
}
