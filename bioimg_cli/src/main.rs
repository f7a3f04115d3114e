use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use bioimg_engine::{load_description, save_bioimageio_package, LoadOptions, PackageOptions};
use bioimg_rdf::build::FormatSelector;
use bioimg_rdf::rdf::model::WeightsFormat;
use bioimg_rdf::Status;

#[derive(Parser)]
#[command(name = "bioimg", about = "Validate and package bioimage.io resource descriptions", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print debug output
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a bioimageio.yaml (or zip package) and print the summary
    Validate {
        /// Path or URL of the resource description
        source: String,

        /// Upgrade to the latest format version before validating
        #[arg(long)]
        update_format: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Skip all checks that require file downloads or reads
        #[arg(long)]
        no_io_checks: bool,
    },
    /// Package a resource with all its files into a zip archive
    Package {
        /// Path or URL of the resource description
        source: String,

        /// Output path of the zip package
        #[arg(long)]
        path: Option<PathBuf>,

        /// Upgrade to the latest format version before packaging
        #[arg(long)]
        update_format: bool,

        /// Only include the first of these weights formats that is present
        #[arg(long, value_delimiter = ',')]
        weights_priority_order: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(ok) => {
            if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<bool, String> {
    match command {
        Command::Validate {
            source,
            update_format,
            json,
            no_io_checks,
        } => {
            let options = LoadOptions {
                format_version: if update_format {
                    FormatSelector::Latest
                } else {
                    FormatSelector::Discover
                },
                perform_io_checks: no_io_checks.then_some(false),
                ..LoadOptions::default()
            };
            let loaded = load_description(&source, &options).map_err(|e| e.to_string())?;
            if json {
                let rendered = serde_json::to_string_pretty(&loaded.summary).map_err(|e| e.to_string())?;
                println!("{rendered}");
            } else {
                print!("{}", loaded.summary);
            }
            Ok(loaded.summary.status != Status::Failed)
        }
        Command::Package {
            source,
            path,
            update_format,
            weights_priority_order,
        } => {
            let priority: Vec<WeightsFormat> = weights_priority_order
                .iter()
                .map(|raw| WeightsFormat::from_str(raw).map_err(|_| format!("unknown weights format '{raw}'")))
                .collect::<Result<_, _>>()?;
            let options = PackageOptions {
                format_selector: if update_format {
                    FormatSelector::Latest
                } else {
                    FormatSelector::Discover
                },
                weights_priority_order: priority,
                ..PackageOptions::default()
            };
            let output = save_bioimageio_package(&source, path.as_deref(), &options).map_err(|e| e.to_string())?;
            println!("{}", output.to_string_lossy());
            Ok(true)
        }
    }
}
