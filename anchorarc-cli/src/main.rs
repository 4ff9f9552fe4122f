//! anchorarc - pack directory trees into a seekable archive and back.

mod commands;
mod utils;

use anchorarc_archive::SymlinkPolicy;
use clap::{Parser, Subcommand, ValueEnum};
use commands::ListOptions;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "anchorarc")]
#[command(
    author,
    version,
    about = "Pack directory trees into a seekable archive",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack files and directories into a new archive
    #[command(visible_alias = "p")]
    Pack {
        /// Files or directories to add
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Archive to create (overwritten if it exists)
        #[arg(short, long)]
        output: PathBuf,

        /// Copy buffer size (e.g. 4096, 64K, 1M)
        #[arg(short, long, default_value = "4096", value_parser = utils::parse_size)]
        buffer_size: usize,

        /// How symbolic links are handled
        #[arg(long, value_enum, default_value_t = SymlinkMode::Physical)]
        symlinks: SymlinkMode,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// List the contents of an archive
    #[command(visible_alias = "l")]
    List {
        /// Archive to list
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Include only paths matching these glob patterns
        #[arg(short = 'I', long = "include")]
        include: Vec<String>,

        /// Exclude paths matching these glob patterns
        #[arg(short = 'X', long = "exclude")]
        exclude: Vec<String>,
    },

    /// Unpack an archive into a directory
    #[command(visible_alias = "u")]
    Unpack {
        /// Archive to unpack
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (created if missing)
        #[arg(short, long)]
        output: PathBuf,

        /// Copy buffer size (e.g. 4096, 64K, 1M)
        #[arg(short, long, default_value = "4096", value_parser = utils::parse_size)]
        buffer_size: usize,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SymlinkMode {
    /// Store links as links
    Physical,
    /// Leave links out of the archive
    Ignore,
}

impl From<SymlinkMode> for SymlinkPolicy {
    fn from(mode: SymlinkMode) -> Self {
        match mode {
            SymlinkMode::Physical => SymlinkPolicy::Physical,
            SymlinkMode::Ignore => SymlinkPolicy::Ignore,
        }
    }
}

fn init_logging(verbose: u8) -> Result<(), Box<dyn std::error::Error>> {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .finish()
        .try_init()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let result = init_logging(cli.verbose).and_then(|()| run(cli.command));
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Pack {
            inputs,
            output,
            buffer_size,
            symlinks,
            progress,
        } => commands::cmd_pack(&inputs, &output, buffer_size, symlinks.into(), progress),
        Commands::List {
            input,
            json,
            include,
            exclude,
        } => commands::cmd_list(
            &input,
            &ListOptions {
                json,
                include: &include,
                exclude: &exclude,
            },
        ),
        Commands::Unpack {
            input,
            output,
            buffer_size,
            progress,
        } => commands::cmd_unpack(&input, &output, buffer_size, progress),
    }
}
