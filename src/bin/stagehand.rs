use clap::{Parser, Subcommand};
use stagehand::{OutputFormat, StagehandConfig};
use tracing::Level;

mod commands;

use commands::{provision, status};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.stagehand/stagehand.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty
    #[clap(short, long, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision all platform databases (the default when no command is given)
    Provision(provision::ProvisionArgs),

    /// Compare the live databases against the schema catalog
    Status(status::StatusArgs),
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level TRACE or higher.
            .with_max_level(Level::INFO)
            .init();
    }

    let config = match StagehandConfig::new(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        // running with no arguments is the startup path: behavior is fully
        // determined by the environment and the embedded catalog
        None => provision::run(&config, provision::ProvisionArgs::default(), cli.format),
        Some(Commands::Provision(args)) => provision::run(&config, args, cli.format),
        Some(Commands::Status(args)) => status::run(&config, args, cli.format),
    }
}
