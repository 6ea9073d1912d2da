use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use umbral::artifact::ArtifactFile;
use umbral::cli::{Cli, Command, EvaluateArgs, MergeArgs, OutputFormat, TargetsArgs};
use umbral::config::EngineConfig;
use umbral::engine::{Engine, EvaluateOptions};
use umbral::error::EvalError;
use umbral::merge::merge;
use umbral::report::inventory_table;

/// Exit code for malformed input or usage errors
const EXIT_MALFORMED: u8 = 2;
/// Exit code when the work was done but could not be saved
const EXIT_PERSIST: u8 = 3;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug || std::env::var_os("RUST_LOG").is_some() {
        let filter = if debug {
            EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
        } else {
            EnvFilter::from_default_env()
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_engine(config: Option<&std::path::Path>) -> Result<Engine> {
    let config = match config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    Ok(Engine::new(config))
}

fn run_evaluate(engine: &Engine, args: EvaluateArgs) -> Result<u8> {
    let options = EvaluateOptions {
        targets: args.targets,
        dry_run: args.dry_run,
    };
    let report = engine.run(&args.artifacts, &options)?;

    match args.format {
        OutputFormat::Text => print!("{}", report.to_text(args.summary)),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    for failure in &report.persist_failures {
        eprintln!("umbral: {}", failure.error);
    }

    Ok(u8::try_from(report.exit_code()).unwrap_or(1))
}

fn run_merge(args: MergeArgs) -> Result<u8> {
    let original = ArtifactFile::load(&args.original)?;
    let incoming = ArtifactFile::load(&args.incoming)?;
    let merged = merge(original.original(), incoming.original());

    let output = args.output.as_deref().unwrap_or(&args.original);
    if let Err(e) = original.write_to(output, &merged) {
        eprintln!("umbral: failed to write {}: {e}", output.display());
        return Ok(EXIT_PERSIST);
    }
    println!(
        "Merged {} results into {} ({})",
        merged.results.len(),
        output.display(),
        merged.uuid
    );
    Ok(0)
}

fn run_targets(engine: &Engine, args: TargetsArgs) -> Result<u8> {
    let files = engine
        .load_artifacts(&args.artifacts)
        .context("cannot inspect artifacts")?;
    print!("{}", inventory_table(&engine.inspect(&files)));
    Ok(0)
}

fn dispatch(cli: Cli) -> Result<u8> {
    match cli.command {
        Command::Merge(args) => run_merge(args),
        Command::Evaluate(args) => run_evaluate(&load_engine(cli.config.as_deref())?, args),
        Command::Targets(args) => run_targets(&load_engine(cli.config.as_deref())?, args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(cli.debug);

    match dispatch(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("umbral: {err:#}");
            let code = match err.downcast_ref::<EvalError>() {
                Some(EvalError::Persist { .. }) => EXIT_PERSIST,
                _ => EXIT_MALFORMED,
            };
            ExitCode::from(code)
        }
    }
}
