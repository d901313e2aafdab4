//! Name-based factory over generated wrappers

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};

use super::algorithm::{Algorithm, AlgorithmSpec, NativeAlgorithm};
use super::context::NativeContext;
use super::params::Parameters;
use crate::error::{Result, SigbindError};
use crate::metadata::Category;

/// Builds one wrapper from a context and its configuration
pub type Constructor = fn(Arc<NativeContext>, Parameters) -> Result<Box<dyn Algorithm>>;

enum Builder {
    Custom(Constructor),
    Generic(&'static AlgorithmSpec),
}

struct Entry {
    category: Category,
    builder: Builder,
}

impl Entry {
    fn build(
        &self,
        ctx: Arc<NativeContext>,
        parameters: Parameters,
    ) -> Result<Box<dyn Algorithm>> {
        match self.builder {
            Builder::Custom(constructor) => constructor(ctx, parameters),
            Builder::Generic(spec) => {
                Ok(Box::new(NativeAlgorithm::new(*spec, ctx, parameters)?))
            }
        }
    }
}

/// Registry of constructible algorithms
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<&'static str, Entry>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("algorithms", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry backed by [`NativeAlgorithm`] for every spec in `table`
    pub fn from_specs(table: &'static [AlgorithmSpec]) -> Self {
        let mut registry = Self::new();
        for spec in table {
            registry.register_spec(spec);
        }
        registry
    }

    /// Register a dedicated constructor
    pub fn register(&mut self, name: &'static str, category: Category, constructor: Constructor) {
        self.insert(name, category, Builder::Custom(constructor));
    }

    /// Register a spec built through the generic [`NativeAlgorithm`]
    pub fn register_spec(&mut self, spec: &'static AlgorithmSpec) {
        self.insert(spec.name, spec.category, Builder::Generic(spec));
    }

    fn insert(&mut self, name: &'static str, category: Category, builder: Builder) {
        if self.entries.insert(name, Entry { category, builder }).is_some() {
            debug!("Replaced registry entry for {}", name);
        }
    }

    /// Build `name` with `parameters`
    pub fn create(
        &self,
        name: &str,
        ctx: Arc<NativeContext>,
        parameters: Parameters,
    ) -> Result<Box<dyn Algorithm>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| SigbindError::UnknownAlgorithm {
                name: name.to_string(),
            })?;
        entry.build(ctx, parameters)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names registered under `category`
    pub fn names_in(&self, category: Category) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.category == category)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Instantiate every registered algorithm with default configuration
    /// and group the instances by the category each one reports
    ///
    /// Construction failures are logged and skipped.
    pub fn by_category(
        &self,
        ctx: &Arc<NativeContext>,
    ) -> BTreeMap<Category, Vec<Box<dyn Algorithm>>> {
        let mut grouped: BTreeMap<Category, Vec<Box<dyn Algorithm>>> = BTreeMap::new();
        for (name, entry) in &self.entries {
            match entry.build(Arc::clone(ctx), Parameters::new()) {
                Ok(algorithm) => grouped.entry(algorithm.category()).or_default().push(algorithm),
                Err(e) => warn!("Skipping {}: {}", name, e),
            }
        }
        grouped
    }
}
