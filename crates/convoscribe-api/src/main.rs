//! convoscribe replay and inspection entry point.
//!
//! Binary name: `cscribe`
//!
//! Parses CLI arguments, sets up tracing, loads engine configuration, then
//! dispatches to the command handler.

mod cli;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,convoscribe_core=debug,convoscribe_infra=debug",
        _ => "trace",
    };
    convoscribe_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "cscribe", &mut std::io::stdout());
        return Ok(());
    }

    let config = convoscribe_infra::config::load_engine_config(&cli.config).await;

    let result = match cli.command {
        Commands::Replay { file, session } => {
            cli::replay::replay(&file, config, session.as_deref(), cli.json).await
        }
        Commands::Inspect { line } => cli::inspect::inspect(&line, cli.json),
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    convoscribe_observe::tracing_setup::shutdown_tracing();
    result
}
