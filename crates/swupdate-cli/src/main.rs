//! swupdateclient - Install and inspect SWUpdate images.
//!
//! Two groups of commands:
//! - **Daemon**: `install`, `status`, `hwrevision` and `versions` talk to the
//!   update daemon over its control socket
//! - **Offline**: `info` and `check` read a `.swu` image or a bare
//!   `sw-description` without a daemon

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod config;
mod logging;

use commands::SelectionArgs;
use config::{FileConfig, Settings};

#[derive(Parser)]
#[command(name = "swupdateclient")]
#[command(author, version, about = "Install and inspect SWUpdate images", long_about = None)]
struct Cli {
    /// More log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Control socket of the update daemon
    #[arg(long, env = "SWUPDATE_SOCKET", global = true)]
    socket: Option<PathBuf>,

    /// Configuration file (default: <config dir>/swupdateclient/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send an update image to the daemon and wait for the result
    Install(commands::install::InstallArgs),

    /// Show the daemon's current status
    Status {
        /// Output as JSON (for machine consumption)
        #[arg(long)]
        json: bool,

        /// Follow the daemon until it is idle again
        #[arg(long)]
        wait: bool,
    },

    /// Show the board name and hardware revision reported by the daemon
    Hwrevision {
        /// Output as JSON (for machine consumption)
        #[arg(long)]
        json: bool,
    },

    /// Restrict the versions the daemon accepts
    Versions {
        /// Lowest accepted version
        #[arg(long = "min")]
        minimum: String,

        /// Highest accepted version
        #[arg(long = "max")]
        maximum: String,

        /// Version currently running
        #[arg(long)]
        current: Option<String>,
    },

    /// Describe an update image (.swu or sw-description)
    Info {
        /// Path to the .swu image or sw-description
        file: PathBuf,

        /// Output as JSON (for machine consumption)
        #[arg(long)]
        json: bool,

        /// Board whose section of the description applies
        #[arg(long)]
        board: Option<String>,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Validate an update image without installing it
    Check {
        /// Path to the .swu image or sw-description
        file: PathBuf,

        /// Board whose section of the description applies
        #[arg(long)]
        board: Option<String>,

        /// Hardware revision to check compatibility against
        #[arg(long, requires = "board")]
        revision: Option<String>,

        #[command(flatten)]
        selection: SelectionArgs,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let file = FileConfig::load(cli.config.as_deref())?;
    let settings = Settings::resolve(file, cli.socket);

    match cli.command {
        Commands::Install(args) => commands::install::run(&settings, args).await,
        Commands::Status { json, wait } => commands::status::run(&settings, json, wait).await,
        Commands::Hwrevision { json } => commands::hwrevision::run(&settings, json).await,
        Commands::Versions {
            minimum,
            maximum,
            current,
        } => commands::versions::run(&settings, minimum, maximum, current).await,
        Commands::Info {
            file,
            json,
            board,
            selection,
        } => commands::info::run(&settings, &file, json, board, &selection),
        Commands::Check {
            file,
            board,
            revision,
            selection,
        } => commands::check::run(&settings, &file, board, revision.as_deref(), &selection),
    }
}
