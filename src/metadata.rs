//! Algorithm metadata table
//!
//! One [`AlgorithmMetadata`] entry per discovered native entity, keyed by
//! name. The table lives for a single generation run.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::select::SelectionSet;

// ============================================================================
// Category
// ============================================================================

/// Functional category of a native algorithm
///
/// Drives both the input/output shape rules of the runtime and the directory
/// layout of the generated tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Category {
    AudioProblems,
    Complex,
    Extractor,
    Filters,
    HighLevel,
    Io,
    MachineLearning,
    Rhythm,
    Sfx,
    Spectral,
    #[default]
    Standard,
    Stats,
    Streaming,
    Synthesis,
    Temporal,
    Tonal,
}

impl Category {
    /// Every category, in declaration order
    pub const ALL: [Category; 16] = [
        Category::AudioProblems,
        Category::Complex,
        Category::Extractor,
        Category::Filters,
        Category::HighLevel,
        Category::Io,
        Category::MachineLearning,
        Category::Rhythm,
        Category::Sfx,
        Category::Spectral,
        Category::Standard,
        Category::Stats,
        Category::Streaming,
        Category::Synthesis,
        Category::Temporal,
        Category::Tonal,
    ];

    /// Canonical name, also used as the Rust variant path in generated code
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AudioProblems => "AudioProblems",
            Category::Complex => "Complex",
            Category::Extractor => "Extractor",
            Category::Filters => "Filters",
            Category::HighLevel => "HighLevel",
            Category::Io => "Io",
            Category::MachineLearning => "MachineLearning",
            Category::Rhythm => "Rhythm",
            Category::Sfx => "Sfx",
            Category::Spectral => "Spectral",
            Category::Standard => "Standard",
            Category::Stats => "Stats",
            Category::Streaming => "Streaming",
            Category::Synthesis => "Synthesis",
            Category::Temporal => "Temporal",
            Category::Tonal => "Tonal",
        }
    }

    /// Directory and module name used in the generated tree
    pub fn module_name(&self) -> &'static str {
        match self {
            Category::AudioProblems => "audio_problems",
            Category::Complex => "complex",
            Category::Extractor => "extractor",
            Category::Filters => "filters",
            Category::HighLevel => "high_level",
            Category::Io => "io",
            Category::MachineLearning => "machine_learning",
            Category::Rhythm => "rhythm",
            Category::Sfx => "sfx",
            Category::Spectral => "spectral",
            Category::Standard => "standard",
            Category::Stats => "stats",
            Category::Streaming => "streaming",
            Category::Synthesis => "synthesis",
            Category::Temporal => "temporal",
            Category::Tonal => "tonal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Case-insensitive, ignores `-`, `_`, `/` and spaces, and accepts the
    /// long-form aliases ("statistical", "i/o", "machine-learning", "ml").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | '/' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        let category = match key.as_str() {
            "audioproblems" => Category::AudioProblems,
            "complex" => Category::Complex,
            "extractor" => Category::Extractor,
            "filters" | "filter" => Category::Filters,
            "highlevel" => Category::HighLevel,
            "io" => Category::Io,
            "machinelearning" | "ml" => Category::MachineLearning,
            "rhythm" => Category::Rhythm,
            "sfx" => Category::Sfx,
            "spectral" => Category::Spectral,
            "standard" => Category::Standard,
            "stats" | "statistical" | "statistics" => Category::Stats,
            "streaming" => Category::Streaming,
            "synthesis" => Category::Synthesis,
            "temporal" => Category::Temporal,
            "tonal" => Category::Tonal,
            _ => return Err(format!("unknown category: {}", s)),
        };
        Ok(category)
    }
}

// ============================================================================
// Mode / Source
// ============================================================================

/// Execution mode exposed by the native library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Standard,
    Streaming,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Standard => "standard",
            Mode::Streaming => "streaming",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which discovery strategy produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoverySource {
    Introspection,
    HeaderScan,
}

// ============================================================================
// AlgorithmMetadata
// ============================================================================

/// Metadata for one discovered native entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmMetadata {
    /// Unique, source-derived identifier
    pub name: String,
    pub category: Category,
    pub mode: Mode,
    pub source: DiscoverySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameter name to declared type; may be empty or partial
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// Header the entry was found in (header-scan entries only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_file: Option<PathBuf>,
    /// Zero-argument construction failure reported by introspection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AlgorithmMetadata {
    /// Create an entry with no description, parameters, or origin
    pub fn new(name: impl Into<String>, category: Category, source: DiscoverySource) -> Self {
        Self {
            name: name.into(),
            category,
            mode: Mode::Standard,
            source,
            description: None,
            parameters: BTreeMap::new(),
            origin_file: None,
            error: None,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin_file = Some(origin.into());
        self
    }
}

// ============================================================================
// MetadataTable
// ============================================================================

/// Outcome of inserting into a [`MetadataTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The name was new
    Inserted,
    /// The name existed; only the missing description was filled in
    Enriched,
    /// The name existed and nothing changed
    Kept,
}

/// Merged discovery results, sorted by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataTable {
    entries: BTreeMap<String, AlgorithmMetadata>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry; the first entry for a name wins
    ///
    /// A later entry for the same name never replaces the existing one, but
    /// may supply a description the existing entry lacks.
    pub fn insert(&mut self, entry: AlgorithmMetadata) -> InsertOutcome {
        match self.entries.get_mut(&entry.name) {
            None => {
                self.entries.insert(entry.name.clone(), entry);
                InsertOutcome::Inserted
            }
            Some(existing) => {
                if existing.description.is_none() && entry.description.is_some() {
                    existing.description = entry.description;
                    InsertOutcome::Enriched
                } else {
                    InsertOutcome::Kept
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&AlgorithmMetadata> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Category of `name`, `Standard` when the name is unknown
    pub fn category_of(&self, name: &str) -> Category {
        self.entries
            .get(name)
            .map(|entry| entry.category)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|name| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlgorithmMetadata> {
        self.entries.values()
    }

    /// Number of entries per category, largest first
    pub fn category_counts(&self) -> Vec<(Category, usize)> {
        let mut counts: HashMap<Category, usize> = HashMap::new();
        for entry in self.entries.values() {
            *counts.entry(entry.category).or_insert(0) += 1;
        }
        let mut counts: Vec<(Category, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts
    }

    /// A copy of this table holding only the selected names
    pub fn restrict(&self, selection: &SelectionSet) -> MetadataTable {
        let entries = self
            .entries
            .iter()
            .filter(|(name, _)| selection.contains(name))
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect();
        MetadataTable { entries }
    }
}

impl FromIterator<AlgorithmMetadata> for MetadataTable {
    fn from_iter<I: IntoIterator<Item = AlgorithmMetadata>>(iter: I) -> Self {
        let mut table = MetadataTable::new();
        for entry in iter {
            table.insert(entry);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("spectral", Category::Spectral)]
    #[test_case("Statistical", Category::Stats)]
    #[test_case("I/O", Category::Io)]
    #[test_case("machine-learning", Category::MachineLearning)]
    #[test_case("AUDIO_PROBLEMS", Category::AudioProblems)]
    fn test_category_from_str(input: &str, expected: Category) {
        assert_eq!(input.parse::<Category>().unwrap(), expected);
    }

    #[test]
    fn test_category_from_str_rejects_unknown() {
        assert!("woodwind".parse::<Category>().is_err());
    }

    #[test]
    fn test_first_insert_wins() {
        let mut table = MetadataTable::new();
        let first = AlgorithmMetadata::new("MFCC", Category::Spectral, DiscoverySource::Introspection);
        let second = AlgorithmMetadata::new("MFCC", Category::Standard, DiscoverySource::HeaderScan)
            .with_origin("/usr/include/essentia/algorithms/standard/mfcc.h");

        assert_eq!(table.insert(first), InsertOutcome::Inserted);
        assert_eq!(table.insert(second), InsertOutcome::Kept);

        let entry = table.get("MFCC").unwrap();
        assert_eq!(entry.category, Category::Spectral);
        assert_eq!(entry.source, DiscoverySource::Introspection);
        assert!(entry.origin_file.is_none());
    }

    #[test]
    fn test_later_insert_enriches_description() {
        let mut table = MetadataTable::new();
        table.insert(AlgorithmMetadata::new("Key", Category::Tonal, DiscoverySource::HeaderScan));
        let outcome = table.insert(
            AlgorithmMetadata::new("Key", Category::Standard, DiscoverySource::Introspection)
                .with_description("Estimates the key"),
        );

        assert_eq!(outcome, InsertOutcome::Enriched);
        let entry = table.get("Key").unwrap();
        assert_eq!(entry.description.as_deref(), Some("Estimates the key"));
        assert_eq!(entry.category, Category::Tonal);
    }

    #[test]
    fn test_category_counts_sorted_descending() {
        let table: MetadataTable = vec![
            AlgorithmMetadata::new("A", Category::Tonal, DiscoverySource::HeaderScan),
            AlgorithmMetadata::new("B", Category::Tonal, DiscoverySource::HeaderScan),
            AlgorithmMetadata::new("C", Category::Rhythm, DiscoverySource::HeaderScan),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            table.category_counts(),
            vec![(Category::Tonal, 2), (Category::Rhythm, 1)]
        );
    }

    #[test]
    fn test_unknown_name_defaults_to_standard() {
        let table = MetadataTable::new();
        assert_eq!(table.category_of("Missing"), Category::Standard);
    }
}
