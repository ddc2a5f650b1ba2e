use std::io;

use clap::Parser;
use joinery::commands::Commands;
use tracing::Level;

#[derive(Parser)]
#[clap(name = "joinery")]
#[clap(version)]
#[clap(about = "Relational joins over json tables", long_about = None)]
struct Cli {
    /// Default log level, `RUST_LOG` takes precedence.
    #[clap(long, global = true, default_value = "warn")]
    log_level: Level,

    /// Output logs in json format.
    #[clap(long, global = true)]
    log_json: bool,

    #[clap(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();

    let format = if cli.log_json {
        logutil::LogFormat::Json
    } else {
        logutil::LogFormat::HumanReadable
    };
    logutil::configure_global_logger(cli.log_level, format, io::stderr);

    if let Err(err) = cli.command.run() {
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
}
