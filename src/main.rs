use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use specline::cli::commands::{self, DiscoverOptions, ReportOptions};
use specline::logging;
use specline::progress::reporter::DEFAULT_ROOT_SUITE;

#[derive(Parser)]
#[command(
    name = "specline",
    about = "Resolve feature hierarchies and report run progress",
    version
)]
struct Cli {
    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve parsed feature files into descriptor trees
    Discover {
        /// Parsed feature files (.json, otherwise YAML)
        files: Vec<PathBuf>,

        /// Output format: yaml or json
        #[arg(long, default_value = "yaml")]
        format: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Turn an NDJSON event log into progress service messages
    Report {
        /// Event log, one JSON event per line
        log: PathBuf,

        /// Report undefined and pending results as failures
        #[arg(long)]
        strict: bool,

        /// Name of the suite wrapping the whole run
        #[arg(long, default_value = DEFAULT_ROOT_SUITE)]
        root_suite: String,

        /// Parsed feature files known before the log starts
        #[arg(long = "feature")]
        features: Vec<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Some(Commands::Discover {
            files,
            format,
            output,
        }) => {
            if files.is_empty() {
                eprintln!("error: no input files provided");
                std::process::exit(1);
            }
            commands::run_discover(&files, &DiscoverOptions { format, output })
        }
        Some(Commands::Report {
            log,
            strict,
            root_suite,
            features,
            output,
        }) => commands::run_report(
            &log,
            &ReportOptions {
                strict,
                root_suite,
                features,
                output,
            },
        ),
        None => {
            // No subcommand: show help
            Cli::parse_from(["specline", "--help"]);
            return;
        }
    };

    match result {
        Ok(out) if out.is_empty() => {}
        Ok(out) if out.ends_with('\n') => print!("{out}"),
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
