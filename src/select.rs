//! Selection of the generation set
//!
//! Applies include globs, exclude globs, a category filter and a
//! per-category minimum population to the merged metadata table. Each stage
//! is the identity when its criterion is empty.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use glob::{MatchOptions, Pattern};
use serde::Serialize;

use crate::error::{Result, SigbindError};
use crate::metadata::{Category, MetadataTable};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Immutable filter criteria
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    categories: BTreeSet<Category>,
    min_count: usize,
}

impl FilterCriteria {
    /// Compile criteria, rejecting malformed glob patterns
    pub fn new<S: AsRef<str>>(
        include: &[S],
        exclude: &[S],
        categories: impl IntoIterator<Item = Category>,
        min_count: usize,
    ) -> Result<Self> {
        Ok(Self {
            include: compile_patterns(include)?,
            exclude: compile_patterns(exclude)?,
            categories: categories.into_iter().collect(),
            min_count,
        })
    }

    /// Criteria that select everything
    pub fn any() -> Self {
        Self::default()
    }

    pub fn min_count(&self) -> usize {
        self.min_count
    }

    pub fn categories(&self) -> &BTreeSet<Category> {
        &self.categories
    }

    fn included(&self, name: &str) -> bool {
        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|pattern| pattern.matches_with(name, MATCH_OPTIONS))
    }

    fn excluded(&self, name: &str) -> bool {
        self.exclude
            .iter()
            .any(|pattern| pattern.matches_with(name, MATCH_OPTIONS))
    }
}

fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Pattern::new(pattern).map_err(|e| SigbindError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.msg.to_string(),
            })
        })
        .collect()
}

/// Ordered, deduplicated list of selected names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSet {
    names: Vec<String>,
    #[serde(skip)]
    index: HashSet<String>,
}

impl SelectionSet {
    /// Build a selection from names; the result is sorted and deduplicated
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let index = sorted.iter().cloned().collect();
        Self {
            names: sorted.into_iter().collect(),
            index,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|name| name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Selected names grouped by their category in `table`
    pub fn by_category<'a>(&'a self, table: &MetadataTable) -> BTreeMap<Category, Vec<&'a str>> {
        let mut groups: BTreeMap<Category, Vec<&str>> = BTreeMap::new();
        for name in self.iter() {
            groups.entry(table.category_of(name)).or_default().push(name);
        }
        groups
    }
}

/// Apply `criteria` to `table`
///
/// Deterministic: the table is name-sorted and so is the result. An empty
/// result is not an error; the caller decides how to report it.
pub fn select(table: &MetadataTable, criteria: &FilterCriteria) -> SelectionSet {
    let mut names: Vec<&str> = table
        .names()
        .filter(|name| criteria.included(name))
        .filter(|name| !criteria.excluded(name))
        .collect();

    if !criteria.categories.is_empty() {
        names.retain(|name| criteria.categories.contains(&table.category_of(name)));
    }

    if criteria.min_count > 0 {
        let mut population: BTreeMap<Category, usize> = BTreeMap::new();
        for name in &names {
            *population.entry(table.category_of(name)).or_insert(0) += 1;
        }
        names.retain(|name| population[&table.category_of(name)] >= criteria.min_count);
    }

    SelectionSet::from_names(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AlgorithmMetadata, DiscoverySource};
    use pretty_assertions::assert_eq;

    fn entry(name: &str, category: Category) -> AlgorithmMetadata {
        AlgorithmMetadata::new(name, category, DiscoverySource::HeaderScan)
    }

    fn sample_table() -> MetadataTable {
        vec![
            entry("PitchYin", Category::Tonal),
            entry("PitchYinFFT", Category::Tonal),
            entry("PitchContours", Category::Spectral),
            entry("MFCC", Category::Spectral),
            entry("Key", Category::Tonal),
            entry("BeatTrackerDegara", Category::Rhythm),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_pitch_tonal_scenario() {
        let criteria = FilterCriteria::new(&["Pitch*"], &[], [Category::Tonal], 2).unwrap();
        let selection = select(&sample_table(), &criteria);
        assert_eq!(selection.names(), &["PitchYin", "PitchYinFFT"]);
    }

    #[test]
    fn test_empty_criteria_selects_everything() {
        let table = sample_table();
        let selection = select(&table, &FilterCriteria::any());
        assert_eq!(selection.len(), table.len());
    }

    #[test]
    fn test_include_is_case_insensitive() {
        let criteria = FilterCriteria::new(&["mfcc"], &[], [], 0).unwrap();
        let selection = select(&sample_table(), &criteria);
        assert_eq!(selection.names(), &["MFCC"]);
    }

    #[test]
    fn test_exclude_applies_after_include() {
        let criteria = FilterCriteria::new(&["Pitch*"], &["*FFT"], [], 0).unwrap();
        let selection = select(&sample_table(), &criteria);
        assert_eq!(selection.names(), &["PitchContours", "PitchYin"]);
    }

    #[test]
    fn test_min_count_drops_whole_category() {
        let criteria = FilterCriteria::new::<&str>(&[], &[], [], 2).unwrap();
        let selection = select(&sample_table(), &criteria);

        assert!(!selection.contains("BeatTrackerDegara"));
        assert!(selection.contains("MFCC"));
        assert!(selection.contains("PitchContours"));
        assert_eq!(selection.len(), 5);
    }

    #[test]
    fn test_min_count_is_evaluated_after_filters() {
        // Three tonal names exist, but only one survives the include stage.
        let criteria = FilterCriteria::new(&["Key", "MFCC", "PitchContours"], &[], [], 2).unwrap();
        let selection = select(&sample_table(), &criteria);
        assert_eq!(selection.names(), &["MFCC", "PitchContours"]);
    }

    #[test]
    fn test_nothing_selected_is_not_an_error() {
        let criteria = FilterCriteria::new(&["Nope*"], &[], [], 0).unwrap();
        assert!(select(&sample_table(), &criteria).is_empty());
    }

    #[test]
    fn test_select_is_idempotent() {
        let table = sample_table();
        let criteria = FilterCriteria::new(&["*"], &["Key"], [], 2).unwrap();
        let first = select(&table, &criteria);
        let second = select(&table.restrict(&first), &criteria);
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = FilterCriteria::new(&["[unterminated"], &[], [], 0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PATTERN");
    }

    #[test]
    fn test_by_category_groups_names() {
        let table = sample_table();
        let selection = select(&table, &FilterCriteria::any());
        let groups = selection.by_category(&table);
        assert_eq!(groups[&Category::Tonal], vec!["Key", "PitchYin", "PitchYinFFT"]);
        assert_eq!(groups[&Category::Rhythm], vec!["BeatTrackerDegara"]);
    }
}
