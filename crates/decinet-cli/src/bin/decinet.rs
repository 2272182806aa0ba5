//! Decinet CLI - query and solve networks stored as JSON definitions
//!
//! Usage:
//!   decinet <file>                              # Validate a network
//!   decinet <file> --list                       # List variables in topological order
//!   decinet <file> -e rain=no -q sprinkler      # Posterior distributions
//!   decinet <file> --policies -o json           # Optimal decision rules as JSON
//!   decinet <file> -e forecast=rainy -q weather --utility
//!   decinet <file> -q weather --utility=satisfaction

use clap::Parser;
use decinet_core::{InferenceError, Network, NetworkDef, SolverConfig, UtilityResult};
use serde_json::json;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "decinet")]
#[command(version)]
#[command(about = "Decinet - exact inference for Bayesian networks and influence diagrams")]
#[command(
    long_about = "Compile a network definition, query posterior distributions, and solve decision policies by variable elimination"
)]
struct Cli {
    /// Network definition (JSON)
    #[arg(value_name = "FILE")]
    file: String,

    /// Observation, repeatable
    #[arg(short, long = "evidence", value_name = "NAME=OUTCOME")]
    evidence: Vec<String>,

    /// Variable to query, repeatable
    #[arg(short, long = "query", value_name = "NAME")]
    query: Vec<String>,

    /// Expected utility over the queries; `--utility=NAME` for a single term
    #[arg(long, value_name = "NAME", num_args = 0..=1, require_equals = true)]
    utility: Option<Option<String>>,

    /// Solve and print every decision policy
    #[arg(long)]
    policies: bool,

    /// List variables in topological order instead of solving
    #[arg(short, long)]
    list: bool,

    /// Solver configuration (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Output format: summary, json, or debug
    #[arg(short, long, default_value = "summary", value_name = "FORMAT")]
    output: String,

    /// Log solver progress to stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Everything a run produced, in request order.
#[derive(Debug, Default)]
struct Report {
    distributions: Vec<(String, Vec<f64>)>,
    utility: Option<UtilityResult>,
    policies: Vec<decinet_core::DecisionPolicy>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    let source = match std::fs::read_to_string(&cli.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", cli.file, e);
            process::exit(1);
        }
    };

    let definition: NetworkDef = match serde_json::from_str(&source) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error parsing '{}': {}", cli.file, e);
            process::exit(1);
        }
    };

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        },
        None => SolverConfig::default(),
    };

    let mut network = match Network::with_config(definition, config) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("Compile error: {}", e);
            process::exit(1);
        }
    };

    tracing::debug!(
        "compiled '{}' with {} variables",
        cli.file,
        network.definition().variables.len()
    );

    if cli.list {
        print_variables(&cli.file, &network);
        return;
    }

    if cli.query.is_empty() && cli.utility.is_none() && !cli.policies {
        println!("✓ Network compiled successfully");
        println!("\nRun with --list to see its variables, -q <name> to query");
        return;
    }

    let report = match run(&cli, &mut network) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error solving '{}': {}", cli.file, e);
            process::exit(1);
        }
    };

    match cli.output.as_str() {
        "json" => match serde_json::to_string_pretty(&format_report(&report)) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing to JSON: {}", e);
                process::exit(1);
            }
        },
        "debug" => {
            println!("{:#?}", report);
        }
        _ => {
            print_summary(&network, &report);
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins unless `-v` was given.
fn init_logging(verbose: u8) -> Result<(), String> {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::try_new(level).map_err(|e| format!("invalid log level '{}': {}", level, e))?
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .map_err(|e| format!("invalid log level '{}': {}", level, e))?
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| format!("failed to set subscriber: {}", e))
}

fn load_config(path: &str) -> Result<SolverConfig, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading config '{}': {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("Error parsing config '{}': {}", path, e))
}

fn parse_evidence(raw: &[String]) -> Result<Vec<(&str, &str)>, InferenceError> {
    raw.iter()
        .map(|item| {
            item.split_once('=')
                .map(|(name, outcome)| (name.trim(), outcome.trim()))
                .ok_or_else(|| {
                    InferenceError::ValidationError(format!(
                        "evidence '{}' must look like NAME=OUTCOME",
                        item
                    ))
                })
        })
        .collect()
}

fn run(cli: &Cli, network: &mut Network) -> Result<Report, InferenceError> {
    let evidence = parse_evidence(&cli.evidence)?;
    let queries: Vec<&str> = cli.query.iter().map(String::as_str).collect();
    let mut report = Report::default();

    if cli.policies {
        report.policies = network.solve_policies()?;
    }
    match &cli.utility {
        Some(term) => {
            report.utility = Some(network.solve_utility(&evidence, &queries, term.as_deref())?);
        }
        None if !queries.is_empty() => {
            report.distributions = network.solve_query(&evidence, &queries)?;
        }
        None => {}
    }
    Ok(report)
}

fn print_variables(file: &str, network: &Network) {
    println!("Variables in '{}':", file);
    for name in network.topological_order() {
        let kind = network
            .kind(name)
            .map(|k| k.to_string())
            .unwrap_or_default();
        let outcomes = network
            .outcome_names(name)
            .map(|o| o.join(", "))
            .unwrap_or_default();
        let parents = network.parents(name).unwrap_or_default();
        if parents.is_empty() {
            println!("  - {} ({}): [{}]", name, kind, outcomes);
        } else {
            println!(
                "  - {} ({}): [{}] given {}",
                name,
                kind,
                outcomes,
                parents.join(", ")
            );
        }
    }
}

fn print_summary(network: &Network, report: &Report) {
    if !report.policies.is_empty() {
        println!("Policies ({}):", report.policies.len());
        for policy in &report.policies {
            print_policy(network, policy);
        }
    }

    if !report.distributions.is_empty() {
        println!("Distributions ({}):", report.distributions.len());
        for (name, probabilities) in &report.distributions {
            println!("  {}:", name);
            let outcomes = network.outcome_names(name).unwrap_or_default();
            for (outcome, p) in outcomes.iter().zip(probabilities) {
                println!("    {} = {:.6}", outcome, p);
            }
        }
    }

    if let Some(utility) = &report.utility {
        match utility.scalar() {
            Some(value) => println!("Expected utility = {:.6}", value),
            None => {
                println!("Expected utility over {}:", utility.variables.join(", "));
                for (row, value) in utility.values.iter().enumerate() {
                    println!("  {} = {:.6}", label(network, &utility.variables, row), value);
                }
            }
        }
    }
}

fn print_policy(network: &Network, policy: &decinet_core::DecisionPolicy) {
    let choices = network.outcome_names(&policy.name).unwrap_or_default();
    if choices.is_empty() {
        return;
    }
    println!("  {}:", policy.name);
    for (row, block) in policy.table.chunks(choices.len()).enumerate() {
        let chosen: Vec<String> = choices
            .iter()
            .zip(block)
            .filter(|(_, p)| **p > 0.0)
            .map(|(c, p)| if *p < 1.0 { format!("{} ({:.3})", c, p) } else { c.clone() })
            .collect();
        if policy.given.is_empty() {
            println!("    -> {}", chosen.join(" | "));
        } else {
            println!(
                "    {} -> {}",
                label(network, &policy.given, row),
                chosen.join(" | ")
            );
        }
    }
}

/// `a=x, b=y` label for row `row` of a row-major table over `names`.
fn label(network: &Network, names: &[String], mut row: usize) -> String {
    let mut parts = Vec::with_capacity(names.len());
    for name in names.iter().rev() {
        let outcomes = network.outcome_names(name).unwrap_or_default();
        let arity = outcomes.len().max(1);
        let outcome = outcomes
            .get(row % arity)
            .map(String::as_str)
            .unwrap_or("?");
        parts.push(format!("{}={}", name, outcome));
        row /= arity;
    }
    parts.reverse();
    parts.join(", ")
}

/// Format a run for JSON serialization
fn format_report(report: &Report) -> serde_json::Value {
    let distributions: serde_json::Map<String, serde_json::Value> = report
        .distributions
        .iter()
        .map(|(name, p)| (name.clone(), json!(p)))
        .collect();
    json!({
        "distributions": distributions,
        "utility": report.utility,
        "policies": report.policies,
    })
}
