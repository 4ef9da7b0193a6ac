

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod commands;
mod config;

use commands::{janitor::JanitorArgs, jobs::JobsArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "mdi")]
#[command(propagate_version = true)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Verbose output
  #[arg(short, long, global = true)]
  verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Execute one ingest run (the scheduler-facing entrypoint)
  Run(RunArgs),

  /// List recent jobs for an environment
  Jobs(JobsArgs),

  /// Mark stale running jobs as failed
  Janitor(JanitorArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
  // Load environment variables
  dotenv().ok();

  // Parse CLI arguments
  let cli = Cli::parse();

  // Load configuration
  let config = config::Config::from_env()?;

  // Initialize logging
  let log_level =
    if cli.verbose { "debug".to_string() } else { config.app.log_level.clone() };
  tracing_subscriber::fmt().with_env_filter(log_level).init();

  // Execute command
  let exit_code = match cli.command {
    Commands::Run(args) => commands::run::execute(args, config).await?,
    Commands::Jobs(args) => {
      commands::jobs::execute(args, config).await?;
      0
    }
    Commands::Janitor(args) => {
      commands::janitor::execute(args, config).await?;
      0
    }
  };

  if exit_code != 0 {
    std::process::exit(exit_code);
  }

  Ok(())
}
