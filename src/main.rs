// Entrypoint for the `grind` CLI.
// - Parses arguments and sets up logging, then hands off to the library.
// - This is the only place that decides to exit the process: any error
//   from the library is reported here and the invocation ends non-zero.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use grind_cli::{bootstrap, version, ConfigStore, Diagnostics, GrindError};

#[derive(Parser)]
#[command(name = "grind")]
#[command(about = "Command-line interface to CodeGrinder", long_about = None)]
struct Cli {
    #[command(flatten)]
    diagnostics: DiagnosticArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DiagnosticArgs {
    /// Report all API requests
    #[arg(long = "api", global = true)]
    api: bool,

    /// Dump API request and response data
    #[arg(long = "api-dump", global = true)]
    api_dump: bool,
}

impl From<&DiagnosticArgs> for Diagnostics {
    fn from(args: &DiagnosticArgs) -> Self {
        Diagnostics {
            report: args.api,
            dump: args.api_dump,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the version number of grind
    Version {
        /// Also show the versions advertised by the server
        #[arg(long)]
        server: bool,
    },

    /// Connect to the CodeGrinder server
    Init {
        /// Server to connect to (defaults to the configured or built-in host)
        #[arg(long)]
        host: Option<String>,
    },
}

fn run(cli: Cli) -> Result<()> {
    let flags = Diagnostics::from(&cli.diagnostics);

    match cli.command {
        Commands::Version { server } => {
            println!("grind {}", version::CURRENT_VERSION);
            if server {
                let store = ConfigStore::locate()?;
                let (_, advertised) = store.load_with_server_version(flags)?;
                println!("server {}", advertised.version);
                println!("  requires grind {}", advertised.grind_version_required);
                println!("  recommends grind {}", advertised.grind_version_recommended);
            }
        }
        Commands::Init { host } => {
            let store = ConfigStore::locate()?;
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            bootstrap::run(&store, host, flags, &mut input, &mut output)
                .with_context(|| format!("grind init did not save {}", store.path().display()))?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(GrindError::UnexpectedStatus { body, .. }) = err.downcast_ref::<GrindError>() {
                let mut stderr = io::stderr();
                let _ = stderr.write_all(body.as_bytes());
                let _ = stderr.flush();
            }
            error!("{:#}", err);
            error!("giving up");
            ExitCode::FAILURE
        }
    }
}
