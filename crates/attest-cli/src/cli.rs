//! Command definitions and argument parsing.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Attest - validate payloads against rule sets and emit proof hashes.
#[derive(Debug, Parser)]
#[command(name = "attest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Runtime configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra rule sets to register (YAML or JSON); overrides the config file
    #[arg(long, global = true)]
    pub rule_sets: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Short human-readable summary
    Text,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate one payload
    Validate(ValidateArgs),

    /// Validate a JSON array of requests concurrently
    Batch(BatchArgs),

    /// Inspect registered rule sets
    #[command(subcommand)]
    RuleSets(RuleSetsCommand),

    /// Print the canonical data hash of a payload
    Hash(PayloadArgs),

    /// List domains and what each one checks
    Domains,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Validation domain (e.g. compliance, social_content)
    #[arg(short, long)]
    pub domain: String,

    /// Rule set id; defaults to the domain's seeded rule set
    #[arg(short, long)]
    pub rule_set: Option<String>,

    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Debug, Args)]
pub struct PayloadArgs {
    /// Payload as inline JSON
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,

    /// Payload file; `-` reads stdin
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// File holding a JSON array of requests; `-` reads stdin
    pub file: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum RuleSetsCommand {
    /// List rule sets
    List {
        /// Only rule sets for this domain
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Show one rule set
    Show {
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_args() {
        let cli = Cli::try_parse_from([
            "attest",
            "validate",
            "--domain",
            "compliance",
            "--data",
            r#"{"walletAddress":"0xabc"}"#,
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.domain, "compliance");
                assert!(args.rule_set.is_none());
                assert!(args.payload.data.is_some());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_data_and_file_conflict() {
        let result = Cli::try_parse_from([
            "attest", "hash", "--data", "{}", "--file", "payload.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rule_sets_subcommand() {
        let cli = Cli::try_parse_from(["attest", "--format", "text", "rule-sets", "show", "defi-kyc-v1"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(matches!(
            cli.command,
            Command::RuleSets(RuleSetsCommand::Show { ref id }) if id == "defi-kyc-v1"
        ));
    }
}
