//! Header-scan discovery
//!
//! Walks include trees and extracts `class Name : ... Algorithm`
//! declarations. Non-conforming headers yield nothing.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;
use walkdir::WalkDir;

use super::DiscoveryStrategy;
use crate::error::Result;
use crate::metadata::{AlgorithmMetadata, Category, DiscoverySource};

/// Conventional install locations scanned when no path is configured
pub const FALLBACK_INCLUDE_DIRS: &[&str] = &[
    "/usr/include/essentia",
    "/usr/local/include/essentia",
    "/opt/homebrew/include/essentia",
    "/usr/include/essentia/algorithms",
    "/usr/local/include/essentia/algorithms",
];

/// Source-checkout location, relative to the working directory
const CHECKOUT_INCLUDE_DIR: &str = "essentia/src/algorithms";

const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp"];

/// Ordered path-fragment table; first match wins
const PATH_CATEGORIES: &[(&str, Category)] = &[
    ("audioproblems", Category::AudioProblems),
    ("complex", Category::Complex),
    ("extractor", Category::Extractor),
    ("filters", Category::Filters),
    ("highlevel", Category::HighLevel),
    ("io", Category::Io),
    ("machinelearning", Category::MachineLearning),
    ("rhythm", Category::Rhythm),
    ("sfx", Category::Sfx),
    ("spectral", Category::Spectral),
    ("standard", Category::Standard),
    ("stats", Category::Stats),
    ("synthesis", Category::Synthesis),
    ("temporal", Category::Temporal),
    ("tonal", Category::Tonal),
];

// Single line only: the base type must appear on the declaration line.
static CLASS_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"class\s+(\w+)\s*:[^\n]*?Algorithm").expect("class declaration pattern is valid")
});

/// Scans header trees for algorithm class declarations
#[derive(Debug, Clone)]
pub struct HeaderScanStrategy {
    roots: Vec<PathBuf>,
}

impl HeaderScanStrategy {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Use `configured` roots, or the existing fallback locations when none
    /// are configured
    pub fn from_search_paths(configured: &[PathBuf]) -> Self {
        if configured.is_empty() {
            Self::new(fallback_include_dirs())
        } else {
            Self::new(configured.to_vec())
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn scan_root(&self, root: &Path, found: &mut Vec<AlgorithmMetadata>) {
        if !root.is_dir() {
            debug!("Skipping missing header root {}", root.display());
            return;
        }

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_header(path) {
                continue;
            }

            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Skipping unreadable header {}: {}", path.display(), e);
                    continue;
                }
            };

            let category = categorize_by_path(path);
            for name in extract_class_names(&content) {
                found.push(
                    AlgorithmMetadata::new(name, category, DiscoverySource::HeaderScan)
                        .with_origin(path),
                );
            }
        }
    }
}

impl DiscoveryStrategy for HeaderScanStrategy {
    fn name(&self) -> &'static str {
        "header-scan"
    }

    fn discover(&self) -> Result<Vec<AlgorithmMetadata>> {
        let mut found = Vec::new();
        for root in &self.roots {
            self.scan_root(root, &mut found);
        }
        info!(
            "Header scan found {} declarations under {} root(s)",
            found.len(),
            self.roots.len()
        );
        Ok(found)
    }
}

/// Existing conventional include directories, in search order
pub fn fallback_include_dirs() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = FALLBACK_INCLUDE_DIRS.iter().map(PathBuf::from).collect();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(CHECKOUT_INCLUDE_DIR));
    }
    candidates.into_iter().filter(|p| p.is_dir()).collect()
}

fn is_header(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| HEADER_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Class names declared as algorithm subclasses, duplicates folded in
/// first-seen order
pub fn extract_class_names(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for captures in CLASS_DECLARATION.captures_iter(content) {
        let name = &captures[1];
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Category of a header from the directory it lives in
///
/// The file name never takes part: `rhythm/onsetdetection.h` is Rhythm even
/// though "detection" contains `io`. Fragments are tried in table order
/// against the whole lower-cased directory path.
pub fn categorize_by_path(path: &Path) -> Category {
    let Some(dir) = path.parent() else {
        return Category::Standard;
    };
    let lower = dir.to_string_lossy().to_lowercase();
    PATH_CATEGORIES
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map_or(Category::Standard, |(_, category)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Mode;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    /// Temp root whose own path carries no category fragment
    fn header_root() -> TempDir {
        for _ in 0..32 {
            let dir = tempdir().unwrap();
            if categorize_by_path(&dir.path().join("x.h")) == Category::Standard {
                return dir;
            }
        }
        panic!("temp directory path always matches a category fragment");
    }

    fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_spectral_header_yields_one_entry() {
        let dir = header_root();
        let header = write(
            dir.path(),
            "algorithms/spectral/foo.h",
            "namespace essentia {\nclass Foo : public Algorithm {\n};\n}\n",
        );

        let found = HeaderScanStrategy::new(vec![dir.path().to_path_buf()])
            .discover()
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Foo");
        assert_eq!(found[0].category, Category::Spectral);
        assert_eq!(found[0].mode, Mode::Standard);
        assert_eq!(found[0].source, DiscoverySource::HeaderScan);
        assert_eq!(found[0].origin_file.as_deref(), Some(header.as_path()));
    }

    #[test]
    fn test_duplicates_in_one_file_are_folded() {
        let content = "class Bar : public Algorithm {};\n\
                       class Baz : public essentia::streaming::Algorithm {};\n\
                       class Bar : public Algorithm {};\n";
        assert_eq!(extract_class_names(content), vec!["Bar", "Baz"]);
    }

    #[test]
    fn test_declaration_must_fit_on_one_line() {
        let content = "class Split :\n    public Algorithm {};\n";
        assert!(extract_class_names(content).is_empty());
    }

    #[test]
    fn test_non_algorithm_classes_are_ignored() {
        let content = "class Helper : public Base {};\nstruct Other {};\n";
        assert!(extract_class_names(content).is_empty());
    }

    #[test]
    fn test_unknown_directory_defaults_to_standard() {
        assert_eq!(
            categorize_by_path(Path::new("/src/misc/thing.h")),
            Category::Standard
        );
        assert_eq!(categorize_by_path(Path::new("thing.h")), Category::Standard);
    }

    #[test]
    fn test_first_path_fragment_wins() {
        assert_eq!(
            categorize_by_path(Path::new("/src/spectral/standard/x.h")),
            Category::Spectral
        );
        assert_eq!(
            categorize_by_path(Path::new("/src/tonal/rhythm/x.h")),
            Category::Rhythm
        );
    }

    #[test]
    fn test_file_name_does_not_affect_category() {
        assert_eq!(
            categorize_by_path(Path::new("/src/rhythm/onsetdetection.h")),
            Category::Rhythm
        );
        assert_eq!(
            categorize_by_path(Path::new("/src/misc/audioio.h")),
            Category::Standard
        );
    }

    #[test]
    fn test_nested_rhythm_header_is_scanned_as_rhythm() {
        let dir = header_root();
        write(
            dir.path(),
            "algorithms/rhythm/onsetdetection.h",
            "class OnsetDetection : public Algorithm {};",
        );

        let found = HeaderScanStrategy::new(vec![dir.path().to_path_buf()])
            .discover()
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, Category::Rhythm);
    }

    #[test]
    fn test_only_header_extensions_are_scanned() {
        let dir = tempdir().unwrap();
        write(dir.path(), "tonal/key.hpp", "class Key : public Algorithm {};");
        write(dir.path(), "tonal/key.cpp", "class KeyImpl : public Algorithm {};");
        write(dir.path(), "tonal/notes.txt", "class Notes : public Algorithm {};");

        let found = HeaderScanStrategy::new(vec![dir.path().to_path_buf()])
            .discover()
            .unwrap();
        let names: Vec<&str> = found.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Key"]);
    }

    #[test]
    fn test_missing_root_is_not_an_error() {
        let strategy = HeaderScanStrategy::new(vec![PathBuf::from("/definitely/not/here")]);
        assert!(strategy.discover().unwrap().is_empty());
    }

    #[test]
    fn test_configured_paths_replace_fallbacks() {
        let configured = vec![PathBuf::from("/opt/custom")];
        let strategy = HeaderScanStrategy::from_search_paths(&configured);
        assert_eq!(strategy.roots(), configured.as_slice());
    }
}
