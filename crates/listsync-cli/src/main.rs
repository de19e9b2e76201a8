use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use listsync_cli::{parse_batches, replay, run_simulator, ConfigReport, SimulatorConfig};
use listsync_core::{telemetry, SyncConfig};
use std::path::PathBuf;
use tracing::info;

fn cli() -> Command {
    Command::new("listsync")
        .version(listsync_cli::VERSION)
        .about("Incremental list reconciliation tooling")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML configuration file"),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a recorded diff stream and print the final list")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of batches of operations"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Check the reconciler against a reference model")
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("batches")
                        .long("batches")
                        .default_value("1000")
                        .value_parser(value_parser!(usize))
                        .help("Number of batches to apply"),
                )
                .arg(
                    Arg::new("max-ops")
                        .long("max-ops")
                        .default_value("8")
                        .value_parser(value_parser!(usize))
                        .help("Maximum operations per batch"),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Print the effective configuration")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<SyncConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(SyncConfig::default()),
    }
}

fn arg<T: Clone + Send + Sync + 'static>(args: &ArgMatches, name: &str) -> Result<T> {
    args.get_one::<T>(name)
        .cloned()
        .with_context(|| format!("missing argument --{name}"))
}

fn run_replay(args: &ArgMatches, config: &SyncConfig) -> Result<()> {
    let path: PathBuf = arg(args, "file")?;
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let batches = parse_batches(&source).with_context(|| format!("parsing {}", path.display()))?;
    info!(batches = batches.len(), path = %path.display(), "replaying");

    let outcome = replay(batches, config).context("replay stopped")?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn run_simulate(args: &ArgMatches) -> Result<bool> {
    let config = SimulatorConfig {
        seed: arg(args, "seed")?,
        batches: arg(args, "batches")?,
        max_ops_per_batch: arg(args, "max-ops")?,
    };
    if config.max_ops_per_batch == 0 {
        bail!("--max-ops must be at least 1");
    }

    println!("Running listsync simulator...");
    println!("Seed: {}", config.seed);
    println!("Batches: {}", config.batches);
    println!();

    let report = run_simulator(config);
    println!("{}", report.generate_text());
    Ok(report.passed())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    telemetry::init_from_config(&config);

    match matches.subcommand() {
        Some(("replay", args)) => run_replay(args, &config)?,
        Some(("simulate", args)) => {
            if !run_simulate(args)? {
                std::process::exit(1);
            }
        }
        Some(("report", args)) => {
            let report = ConfigReport::new(config);
            if args.get_flag("json") {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report.generate_text());
            }
        }
        _ => bail!("unknown subcommand"),
    }
    Ok(())
}
