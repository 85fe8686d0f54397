use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Latch Command Line Interface
///
/// Installs isolated extension namespaces into this process.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Print results as JSON
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a home directory
    Init {
        /// Home directory to create
        #[clap(long)]
        home: PathBuf,
    },

    /// Install a namespace as if loaded at process start
    Load {
        /// Feature string, e.g. "home=/opt/latch;namespace=default"
        #[clap(long, default_value = "")]
        feature: String,

        /// Uninstall right after installing instead of waiting for Ctrl-C
        #[clap(long, hide = true)]
        no_wait: bool,
    },

    /// Install a namespace as if attached to a running process
    Attach {
        /// Feature string, e.g. "home=/opt/latch;namespace=default;token=abc"
        #[clap(long, default_value = "")]
        feature: String,

        /// Result file to append to instead of ~/.latch.token
        #[clap(long)]
        result_file: Option<PathBuf>,

        /// Uninstall right after installing instead of waiting for Ctrl-C
        #[clap(long, hide = true)]
        no_wait: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { home } => commands::init::run(&home, cli.json),
        Commands::Load { feature, no_wait } => {
            commands::install::run(
                &feature,
                commands::install::Mode::Load,
                None,
                !no_wait,
                cli.json,
            )
            .await
        }
        Commands::Attach {
            feature,
            result_file,
            no_wait,
        } => {
            commands::install::run(
                &feature,
                commands::install::Mode::Attach,
                result_file,
                !no_wait,
                cli.json,
            )
            .await
        }
    }
}
