mod harvest;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "frh-cli")]
#[command(about = "Harvester for municipal association registries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Harvest one site, or every site in the catalog.
    Run(harvest::RunArgs),
    /// List the sites the harvester knows about.
    Sites,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = frh_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => harvest::run(&config, &args).await,
        Commands::Sites => {
            harvest::print_sites();
            Ok(())
        }
    }
}
