//! nlroute command - host addresses, source routes, rules and route lookups.

mod commands;
mod output;

use std::time::Duration;

use clap::{Parser, Subcommand};
use nlroute::netlink::{Connection, ConnectionConfig};
use nlroute::Outcome;
use output::{OutputFormat, OutputOptions};

#[derive(Parser)]
#[command(name = "nlroute", version, about = "Routing control over rtnetlink")]
struct Cli {
    /// Output JSON.
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Pretty print JSON.
    #[arg(short = 'p', long, global = true)]
    pretty: bool,

    /// Per-receive timeout in milliseconds.
    #[arg(long, default_value_t = 1000, global = true)]
    timeout: u64,

    /// Transmissions allowed while the kernel reports EBUSY.
    #[arg(long, default_value_t = 3, global = true)]
    retries: u32,

    /// Enable debug logging.
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage IP addresses.
    #[command(visible_alias = "a", visible_alias = "address")]
    Addr(commands::addr::AddrCmd),

    /// Manage source routes and query route selection.
    #[command(visible_alias = "r")]
    Route(commands::route::RouteCmd),

    /// Manage routing policy rules.
    #[command(visible_alias = "ru")]
    Rule(commands::rule::RuleCmd),

    /// Show links or addresses.
    #[command(visible_alias = "s")]
    Show(commands::show::ShowCmd),

    /// Monitor link, address and route events.
    #[command(visible_alias = "m", visible_alias = "mon")]
    Monitor(commands::monitor::MonitorCmd),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let opts = OutputOptions {
        pretty: cli.pretty,
        timestamp: false,
    };

    let config = ConnectionConfig::new()
        .timeout(Duration::from_millis(cli.timeout))
        .retries(cli.retries);

    let result = run(cli.command, config, format, &opts).await;
    let outcome = Outcome::of(&result);
    if let Err(e) = result {
        eprintln!("Error: {} ({})", e, outcome.classification);
        std::process::exit(outcome.exit_code());
    }

    Ok(())
}

async fn run(
    command: Command,
    config: ConnectionConfig,
    format: OutputFormat,
    opts: &OutputOptions,
) -> nlroute::Result<()> {
    match command {
        // The monitor opens its own subscribed socket.
        Command::Monitor(cmd) => cmd.run(format, opts).await,
        Command::Addr(cmd) => cmd.run(&Connection::with_config(config)?).await,
        Command::Route(cmd) => {
            cmd.run(&Connection::with_config(config)?, format, opts)
                .await
        }
        Command::Rule(cmd) => cmd.run(&Connection::with_config(config)?).await,
        Command::Show(cmd) => {
            cmd.run(&Connection::with_config(config)?, format, opts)
                .await
        }
    }
}
