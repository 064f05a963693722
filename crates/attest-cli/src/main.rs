//! Attest CLI - validate payloads and print verdicts with proof hashes.

mod cli;

use anyhow::{bail, Context, Result};
use attest_core::{data_hash, RuleSet, ValidationDomain, ValidationOutcome, ValidationRequest, Verdict};
use attest_runtime::{RuntimeConfig, ValidationEngine};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, OutputFormat, PayloadArgs, RuleSetsCommand};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.format;

    if let Command::Hash(args) = &cli.command {
        let payload = read_payload(args)?;
        let hash = data_hash(&payload);
        match format {
            OutputFormat::Json => print_json(&serde_json::json!({ "dataHash": hash }))?,
            OutputFormat::Text => println!("{}", hash),
        }
        return Ok(());
    }

    let engine = build_engine(&cli)?;

    match cli.command {
        Command::Validate(args) => {
            let domain: ValidationDomain = args.domain.parse()?;
            let payload = read_payload(&args.payload)?;
            let rule_set_id = args
                .rule_set
                .unwrap_or_else(|| domain.default_rule_set_id().to_string());

            let outcome = engine
                .validate(ValidationRequest::new(domain, rule_set_id, payload))
                .await?;
            match format {
                OutputFormat::Json => print_json(&outcome)?,
                OutputFormat::Text => print_outcome(&outcome),
            }
            if !outcome.verdict.is_valid {
                std::process::exit(2);
            }
        }
        Command::Batch(args) => {
            let raw = read_source(&args.file)?;
            let requests: Vec<ValidationRequest> =
                serde_json::from_str(&raw).context("Batch file must be a JSON array of requests")?;

            let verdicts = engine.batch_validate(requests).await;
            match format {
                OutputFormat::Json => print_json(&verdicts)?,
                OutputFormat::Text => {
                    for (index, verdict) in verdicts.iter().enumerate() {
                        println!("[{}] {}", index, summarize(verdict));
                    }
                }
            }
        }
        Command::RuleSets(RuleSetsCommand::List { domain }) => {
            let domain = domain.map(|d| d.parse::<ValidationDomain>()).transpose()?;
            let rule_sets = engine.list_rule_sets(domain);
            match format {
                OutputFormat::Json => print_json(&rule_sets)?,
                OutputFormat::Text => {
                    for rule_set in &rule_sets {
                        print_rule_set_line(rule_set);
                    }
                }
            }
        }
        Command::RuleSets(RuleSetsCommand::Show { id }) => {
            let rule_set = engine.get_rule_set(&id)?;
            match format {
                OutputFormat::Json => print_json(&rule_set)?,
                OutputFormat::Text => print!("{}", serde_yaml::to_string(&rule_set)?),
            }
        }
        Command::Domains => {
            let capabilities: Vec<_> = engine
                .available_domains()
                .into_iter()
                .map(|domain| engine.capabilities(domain))
                .collect();
            match format {
                OutputFormat::Json => print_json(&capabilities)?,
                OutputFormat::Text => {
                    for caps in &capabilities {
                        let ai = caps.ai_model.as_deref().unwrap_or("heuristic only");
                        println!(
                            "{} ({}, {}, circuit {}, {} fallbacks)",
                            caps.domain,
                            caps.default_rule_set_id,
                            ai,
                            caps.circuit.state,
                            caps.circuit.fallbacks
                        );
                        for capability in &caps.capabilities {
                            println!("  - {}", capability);
                        }
                    }
                }
            }
        }
        Command::Hash(_) => unreachable!("handled before engine construction"),
    }

    Ok(())
}

fn build_engine(cli: &Cli) -> Result<ValidationEngine> {
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if let Some(path) = &cli.rule_sets {
        config.rule_sets_file = Some(path.clone());
    }

    let engine = ValidationEngine::from_config(&config)?;
    tracing::debug!(?engine, "Engine ready");
    Ok(engine)
}

fn read_payload(args: &PayloadArgs) -> Result<Value> {
    let raw = match (&args.data, &args.file) {
        (Some(data), _) => data.clone(),
        (None, Some(path)) => read_source(path)?,
        (None, None) => bail!("Provide a payload with --data or --file"),
    };
    serde_json::from_str(&raw).context("Payload is not valid JSON")
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn summarize(verdict: &Verdict) -> String {
    let status = if verdict.is_valid { "VALID" } else { "INVALID" };
    let mut line = format!("{} confidence={:.2}", status, verdict.confidence);
    if let Some(errors) = &verdict.errors {
        line.push_str(&format!(" errors={}", errors.join("; ")));
    }
    line
}

fn print_outcome(outcome: &ValidationOutcome) {
    println!("{}", summarize(&outcome.verdict));
    for flag in outcome.verdict.flags() {
        println!("  flag: {}", flag);
    }
    println!("  ruleSetId: {}", outcome.proof.rule_set_id);
    println!("  dataHash:  {}", outcome.proof.data_hash);
    println!("  proofHash: {}", outcome.proof.proof_hash);
}

fn print_rule_set_line(rule_set: &RuleSet) {
    let status = if rule_set.active { "" } else { " (inactive)" };
    println!(
        "{:<24} {:<20} {}{}",
        rule_set.id,
        rule_set.domain.as_str(),
        rule_set.display_name,
        status
    );
}
