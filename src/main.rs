use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use devup::config::SupervisorConfig;
use devup::reclaim::PortReclaimer;
use devup::supervisor::Supervisor;

#[derive(Parser, Debug)]
#[command(
    name = "devup",
    version,
    about = "Development environment supervisor: frees service ports, starts the dev servers, and stops them together on Ctrl-C."
)]
struct Cli {
    /// Raise log output to debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reclaim ports and launch every configured service (the default)
    Up {
        /// Config file path (defaults to ./devup.yaml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Reclaim ports without launching anything
    Reclaim {
        /// Ports to reclaim; configured service ports when omitted
        ports: Vec<u16>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = devup::logging::init(cli.verbose) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::from(1);
    }

    let command = cli.command.unwrap_or(Commands::Up { config: None });
    match run(command).await {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Up { config } => {
            let config = SupervisorConfig::load(config.as_deref())?;
            Supervisor::new(config).run().await?;
            Ok(())
        }
        Commands::Reclaim { ports, config } => {
            let ports = if ports.is_empty() {
                SupervisorConfig::load(config.as_deref())?.ports()
            } else {
                ports
            };
            let reclaimer = PortReclaimer::default();
            for port in ports {
                let issued = reclaimer.reclaim(port);
                println!("port {port}: {issued} kill request(s) issued");
            }
            Ok(())
        }
        Commands::Config { config } => {
            let config = SupervisorConfig::load(config.as_deref())?;
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}
