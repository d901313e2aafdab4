//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use log::{info, warn};
use serde::Serialize;

use crate::classify::classify;
use crate::codegen::Generator;
use crate::config::GeneratorConfig;
use crate::discovery::{Discoverer, DiscoveryReport};
use crate::error::Result;
use crate::metadata::AlgorithmMetadata;
use crate::select::select;

/// How a command run ended, for the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failure,
}

/// Run every configured discovery strategy
pub fn run_discovery(config: &GeneratorConfig) -> DiscoveryReport {
    let discoverer = Discoverer::from_config(config);
    info!(
        "Discovering algorithms via {}",
        discoverer.strategy_names().join(", ")
    );
    discoverer.discover()
}

/// Discover, select and generate.
pub fn generate(config: &GeneratorConfig, verbose: bool) -> Result<RunStatus> {
    // Bad globs fail before any discovery work
    let criteria = config.criteria()?;

    let report = run_discovery(config);
    let table = report.table;
    println!("Discovered {} algorithms", table.len());

    if verbose {
        println!("Algorithms by category:");
        for (category, count) in table.category_counts() {
            println!("  {}: {}", category, count);
        }
    }

    let selection = select(&table, &criteria);
    if selection.is_empty() {
        warn!("No algorithms match the specified criteria.");
        return Ok(if table.is_empty() {
            RunStatus::Failure
        } else {
            RunStatus::Success
        });
    }
    println!("Selected {} algorithms for generation.", selection.len());

    let generator = Generator::from_config(config);

    if config.dry_run {
        let plan = generator.plan(&selection, &table);
        println!("Dry run - files that would be generated:");
        for (category, files) in &plan.algorithms {
            println!("{}/", category);
            for file in files {
                println!("  {}", file.display());
            }
        }
        println!("Support files:");
        for file in plan.support_files() {
            println!("  {}", file.display());
        }
        for failure in &plan.failures {
            println!("Cannot generate {}: {}", failure.subject, failure.reason);
        }
        return Ok(RunStatus::Success);
    }

    let report = generator.generate(&selection, &table)?;
    for (path, outcome) in &report.files {
        println!("{:>11}  {}", outcome, path.display());
    }
    for failure in &report.failures {
        println!("{:>11}  {}: {}", "failed", failure.subject, failure.reason);
    }
    println!("{}", report.summary());

    Ok(if report.is_clean() {
        RunStatus::Success
    } else {
        RunStatus::Failure
    })
}

#[derive(Serialize)]
struct DiscoveryOutput<'a> {
    algorithms: Vec<&'a AlgorithmMetadata>,
    strategies: Vec<StrategyOutput<'a>>,
}

#[derive(Serialize)]
struct StrategyOutput<'a> {
    strategy: &'a str,
    found: usize,
    inserted: usize,
    failure: Option<&'a str>,
}

/// Print the merged metadata table as JSON.
pub fn discover(config: &GeneratorConfig) -> Result<RunStatus> {
    let report = run_discovery(config);
    let output = DiscoveryOutput {
        algorithms: report.table.iter().collect(),
        strategies: report
            .strategies
            .iter()
            .map(|s| StrategyOutput {
                strategy: s.strategy,
                found: s.found,
                inserted: s.inserted,
                failure: s.failure.as_deref(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(if report.table.is_empty() {
        RunStatus::Failure
    } else {
        RunStatus::Success
    })
}

/// Print the category of each name.
pub fn classify_names(names: &[String]) -> RunStatus {
    for name in names {
        println!("{}\t{}", name, classify(name));
    }
    RunStatus::Success
}
