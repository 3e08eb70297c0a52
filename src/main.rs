use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use infodemic::manager::Manager;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a population and simulate a new run.
    Create,

    /// Continue a run from its last checkpoint.
    Resume {
        #[arg(long)]
        run_idx: usize,
    },

    /// Export the history and summary observables of every run.
    Analyze,

    /// Delete every run directory.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let Cli { sim_dir, command } = Cli::parse();
    log::info!("{command:?} in {sim_dir:?}");

    let mgr = Manager::new(&sim_dir).context("failed to load simulation directory")?;

    match command {
        Command::Create => mgr.create_run().context("failed to create run")?,
        Command::Resume { run_idx } => mgr
            .resume_run(run_idx)
            .with_context(|| format!("failed to resume run {run_idx}"))?,
        Command::Analyze => mgr.analyze_sim().context("failed to analyze runs")?,
        Command::Clean => mgr.clean_sim().context("failed to clean runs")?,
    }

    log::info!("{sim_dir:?} is up to date");
    Ok(())
}
