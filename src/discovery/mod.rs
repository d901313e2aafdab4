//! Entity discovery
//!
//! Strategies run in order and write into one [`MetadataTable`]; the first
//! strategy to report a name owns its entry. A failing strategy is logged
//! and skipped, so discovery itself never fails.

pub mod headers;
pub mod introspection;

use log::{info, warn};

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::metadata::{AlgorithmMetadata, InsertOutcome, MetadataTable};

pub use headers::HeaderScanStrategy;
pub use introspection::IntrospectionStrategy;

/// A source of algorithm metadata
pub trait DiscoveryStrategy {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Enumerate entities; an error means the strategy is unavailable
    fn discover(&self) -> Result<Vec<AlgorithmMetadata>>;
}

/// Per-strategy outcome of a discovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyReport {
    pub strategy: &'static str,
    pub found: usize,
    pub inserted: usize,
    /// Set when the strategy failed and contributed nothing
    pub failure: Option<String>,
}

/// Merged table plus what each strategy contributed
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub table: MetadataTable,
    pub strategies: Vec<StrategyReport>,
}

impl DiscoveryReport {
    /// True when at least one strategy failed
    pub fn degraded(&self) -> bool {
        self.strategies.iter().any(|s| s.failure.is_some())
    }
}

/// Runs discovery strategies in priority order
#[derive(Default)]
pub struct Discoverer {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl Discoverer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Introspection first (unless skipped), then the header scan
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let mut discoverer = Self::new();
        if !config.skip_introspection {
            discoverer = discoverer.with_strategy(IntrospectionStrategy::new(
                config.tool_path.clone(),
                config.introspection_timeout(),
            ));
        }
        discoverer.with_strategy(HeaderScanStrategy::from_search_paths(&config.header_paths))
    }

    /// Append a strategy; later strategies have lower priority
    pub fn with_strategy(mut self, strategy: impl DiscoveryStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn discover(&self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for strategy in &self.strategies {
            let entries = match strategy.discover() {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("{} discovery unavailable: {}", strategy.name(), e);
                    report.strategies.push(StrategyReport {
                        strategy: strategy.name(),
                        found: 0,
                        inserted: 0,
                        failure: Some(e.to_string()),
                    });
                    continue;
                }
            };

            let found = entries.len();
            let mut inserted = 0;
            for entry in entries {
                if report.table.insert(entry) == InsertOutcome::Inserted {
                    inserted += 1;
                }
            }

            info!(
                "{} discovery: {} found, {} new",
                strategy.name(),
                found,
                inserted
            );
            report.strategies.push(StrategyReport {
                strategy: strategy.name(),
                found,
                inserted,
                failure: None,
            });
        }

        report
    }
}
