//! tickbar CLI - Streaming one-minute OHLCV aggregation of tick feeds.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tickbar_lib::LatePolicy;

mod commands;
mod obs;

use obs::LogFormat;

#[derive(Parser)]
#[command(name = "tickbar")]
#[command(about = "Streaming one-minute OHLCV aggregation of tick feeds", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate NDJSON ticks into one-minute OHLCV summaries
    Run {
        /// Symbols to aggregate (space or comma separated). Omit for all.
        #[arg(short, long, num_args = 1.., value_delimiter = ',')]
        symbols: Vec<String>,

        /// Tick input file, or - for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Directory for aggregated_data_<symbol>.jsonl files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Also write each summary to stdout as NDJSON
        #[arg(long)]
        stdout: bool,

        /// Handling of ticks older than the open window (reject, append)
        #[arg(long, default_value = "reject")]
        late_policy: LatePolicy,

        /// Deliver to all sinks concurrently
        #[arg(long)]
        concurrent_sinks: bool,

        /// Additional field every tick must carry (repeatable)
        #[arg(long = "require-field")]
        require_fields: Vec<String>,
    },

    /// Emit synthetic NDJSON ticks on stdout
    Generate {
        /// Symbol to generate
        #[arg(short, long, default_value = "BTCUSDT")]
        symbol: String,

        /// Starting price
        #[arg(short, long, default_value = "45000")]
        base_price: f64,

        /// Number of ticks (omit to run until interrupted)
        #[arg(short, long)]
        count: Option<u64>,

        /// Generate BTCUSDT, ETHUSDT, ADAUSDT and DOTUSDT instead of --symbol
        #[arg(long)]
        multi_symbol: bool,

        /// Random seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Wall-clock delay between ticks; timestamps then use the current time
        #[arg(long, default_value = "0")]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    obs::init_tracing(
        obs::level_for(cli.verbose, cli.quiet),
        cli.log_format,
        cli.log_file.as_deref(),
    )?;

    match command {
        Commands::Run {
            symbols,
            input,
            output_dir,
            stdout,
            late_policy,
            concurrent_sinks,
            require_fields,
        } => {
            commands::run::run(commands::run::RunOptions {
                symbols,
                input,
                output_dir,
                stdout,
                late_policy,
                concurrent_sinks,
                require_fields,
            })
            .await
        }
        Commands::Generate {
            symbol,
            base_price,
            count,
            multi_symbol,
            seed,
            interval_ms,
        } => {
            commands::generate::generate(commands::generate::GenerateOptions {
                symbol,
                base_price,
                count,
                multi_symbol,
                seed,
                interval_ms,
            })
            .await
        }
    }
}
