use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use mwp_rs::analysis::Analysis;
use mwp_rs::constraint::{ConstraintParser, OverrideTable};
use mwp_rs::record::ErrorResponse;
use mwp_rs::search::{SearchConfig, Strategy};
use mwp_rs::validate::SelectionReport;

#[derive(Parser)]
#[command(author, version, about = "Feature-model analyzer: rules and Minimum Working Products")]
struct Cli {
    /// Feature-model XML document
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Exact translation for an English constraint, as "<statement>=<rule>" (repeatable)
    #[arg(long, value_name = "PAIR")]
    translate: Vec<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: simplelog::LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum StrategyArg {
    Sat,
    Brute,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the feature tree as JSON
    Tree,

    /// Print the categorized rules
    Logic,

    /// Enumerate Minimum Working Products
    Mwp {
        #[arg(long, value_enum, default_value = "sat")]
        strategy: StrategyArg,

        /// Explore every atom instead of pinning the forced features
        #[arg(long)]
        no_pruning: bool,

        /// Maximum number of candidates to examine
        #[arg(long, value_name = "INT")]
        budget: Option<u64>,

        /// Wall-clock limit in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Only keep products of smallest size
        #[arg(long)]
        minimal: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count valid products without enumerating them
    Count,

    /// Core, dead and per-feature commonality
    Core,

    /// Check a selection against every rule
    Check {
        /// Comma-separated feature names, e.g. "App,Catalog,Filtered"
        select: String,
    },

    /// Structural group check of a selection
    Validate {
        /// Comma-separated feature names
        select: String,
    },

    /// Print the clause encoding in DIMACS format
    Dimacs,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    simplelog::TermLogger::init(
        cli.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    log::info!("Loading feature model from {:?}", cli.input);
    let text = std::fs::read_to_string(&cli.input)?;

    let parser = ConstraintParser::new().with_override(parse_overrides(&cli.translate)?);
    let analysis = match Analysis::from_xml_with(&text, parser) {
        Ok(analysis) => analysis,
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&err))?);
            return Err(err.into());
        }
    };

    for diag in analysis.diagnostics() {
        println!("! {}", diag);
    }

    match cli.command {
        Commands::Tree => {
            println!("{}", serde_json::to_string_pretty(&analysis.parse_response())?);
        }

        Commands::Logic => {
            print!("{}", analysis.rules());
            for parsed in analysis.constraints() {
                if parsed.is_best_effort() {
                    println!("? {:?} was translated heuristically as {}", parsed.source, parsed.rule());
                }
            }
        }

        Commands::Mwp {
            strategy,
            no_pruning,
            budget,
            timeout,
            minimal,
            json,
        } => {
            let mut config = SearchConfig::default()
                .with_strategy(match strategy {
                    StrategyArg::Sat => Strategy::Sat,
                    StrategyArg::Brute => Strategy::BruteForce,
                })
                .with_mandatory_pruning(!no_pruning)
                .with_minimal_only(minimal);
            if let Some(budget) = budget {
                config = config.with_candidate_budget(budget);
            }
            if let Some(secs) = timeout {
                config = config.with_time_budget(Duration::from_secs(secs));
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis.report(&config))?);
            } else {
                let report = analysis.search(&config);
                println!("Products ({}):", report.products.len());
                for product in &report.products {
                    println!("  {}", product);
                }
                if !report.is_complete() {
                    println!("Search stopped early: {:?}", report.status);
                }
                println!(
                    "Explored {} of {} candidates in {:?}",
                    report.stats.candidates_explored, report.stats.search_space, report.stats.elapsed
                );
            }
        }

        Commands::Count => {
            println!("Valid products: {}", analysis.count());
        }

        Commands::Core => {
            let report = analysis.search(&SearchConfig::default());
            if report.products.is_empty() {
                println!("✗ Feature model is void (no valid products)");
            }
            println!("Core features: {}", report.core_features().join(", "));
            println!("Dead features: {}", report.dead_features().join(", "));
            println!("Feature commonality:");
            for (name, ratio) in report.commonality() {
                println!("  {} = {:.2}%", name, ratio * 100.0);
            }
        }

        Commands::Check { select } => {
            let check = analysis.check_selection(split_names(&select));
            if check.is_valid {
                println!("✓ Selection is a valid product");
            } else {
                println!("✗ Selection is invalid");
                for rule in &check.violated {
                    println!("  violates {}", rule);
                }
                for name in &check.unknown {
                    println!("  unknown feature {}", name);
                }
            }
        }

        Commands::Validate { select } => {
            let selection = SelectionReport::from_selection(&analysis.catalog(), split_names(&select));
            println!("{}", serde_json::to_string_pretty(&analysis.validate(&selection))?);
        }

        Commands::Dimacs => {
            let base = analysis.rule_base();
            print!("{}", base.to_cnf().to_dimacs(base.universe()));
        }
    }

    Ok(())
}

fn split_names(list: &str) -> Vec<&str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn parse_overrides(pairs: &[String]) -> Result<OverrideTable> {
    let mut table = OverrideTable::default();
    for pair in pairs {
        let Some((statement, rule)) = pair.split_once('=') else {
            return Err(color_eyre::eyre::eyre!("Invalid translation format: {}", pair));
        };
        table.insert(statement, rule.trim());
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_rule_may_contain_equals() {
        let table = parse_overrides(&["Gold needs Tier=Gold => Tier".to_string()]).unwrap();
        assert_eq!(table.0.get("Gold needs Tier").map(String::as_str), Some("Gold => Tier"));
        assert!(parse_overrides(&["no separator".to_string()]).is_err());
    }
}
