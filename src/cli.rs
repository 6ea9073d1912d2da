//! CLI argument parsing for Umbral

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for evaluation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "umbral")]
#[command(version)]
#[command(about = "Compliance evidence regression gate with self-advancing baselines", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    /// Engine configuration file (TOML)
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare the latest result of every target against its threshold
    Evaluate(EvaluateArgs),

    /// Merge two evidence artifacts
    Merge(MergeArgs),

    /// List targets with their current threshold and latest result
    Targets(TargetsArgs),
}

#[derive(clap::Args, Debug)]
pub struct EvaluateArgs {
    /// Also print a table of every classified finding
    #[arg(short = 's', long = "summary")]
    pub summary: bool,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Only evaluate these targets (repeatable)
    #[arg(short = 't', long = "target", value_name = "NAME")]
    pub targets: Vec<String>,

    /// Evaluate without writing any artifact back
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Evidence artifacts (YAML or JSON)
    #[arg(required = true, value_name = "ARTIFACT")]
    pub artifacts: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct MergeArgs {
    /// Where to write the merged artifact (default: ORIGINAL)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Artifact to merge into
    pub original: PathBuf,

    /// Artifact whose results are merged in
    pub incoming: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct TargetsArgs {
    /// Evidence artifacts (YAML or JSON)
    #[arg(required = true, value_name = "ARTIFACT")]
    pub artifacts: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(cli: Cli) -> EvaluateArgs {
        match cli.command {
            Command::Evaluate(args) => args,
            other => panic!("expected evaluate, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_evaluate_defaults() {
        let cli = Cli::parse_from(["umbral", "evaluate", "ar.yaml"]);
        assert!(!cli.debug);
        assert!(cli.config.is_none());
        let args = evaluate(cli);
        assert!(!args.summary);
        assert!(!args.dry_run);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(args.targets.is_empty());
        assert_eq!(args.artifacts, vec![PathBuf::from("ar.yaml")]);
    }

    #[test]
    fn test_cli_evaluate_flags() {
        let cli = Cli::parse_from([
            "umbral",
            "evaluate",
            "--summary",
            "--format",
            "json",
            "-t",
            "cluster-a",
            "--target",
            "cluster-b",
            "--dry-run",
            "a.json",
            "b.yaml",
        ]);
        let args = evaluate(cli);
        assert!(args.summary);
        assert!(args.dry_run);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.targets, vec!["cluster-a", "cluster-b"]);
        assert_eq!(args.artifacts.len(), 2);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["umbral", "evaluate", "--debug", "--config", "u.toml", "a.json"]);
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("u.toml")));
    }

    #[test]
    fn test_cli_evaluate_requires_artifact() {
        assert!(Cli::try_parse_from(["umbral", "evaluate"]).is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["umbral", "evaluate", "--format", "csv", "a.json"]).is_err());
    }

    #[test]
    fn test_cli_merge() {
        let cli = Cli::parse_from(["umbral", "merge", "-o", "out.yaml", "a.yaml", "b.yaml"]);
        match cli.command {
            Command::Merge(args) => {
                assert_eq!(args.output, Some(PathBuf::from("out.yaml")));
                assert_eq!(args.original, PathBuf::from("a.yaml"));
                assert_eq!(args.incoming, PathBuf::from("b.yaml"));
            }
            other => panic!("expected merge, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_targets() {
        let cli = Cli::parse_from(["umbral", "targets", "a.yaml"]);
        assert!(matches!(cli.command, Command::Targets(_)));
    }
}
