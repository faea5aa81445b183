//! Kuma Mieru server: entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use kuma_mieru::settings::DEFAULT_CONFIG_PATH;
use kuma_mieru::{
    generate_config, write_generated_config, ConfigResolver, FeatureOverrides, HttpClient,
    PreloadResolver, Settings,
};
use kuma_mieru_server::AppState;

const DEFAULT_ADDR: &str = "127.0.0.1:3883";

#[derive(Parser)]
#[command(
    name = "kuma-mieru-server",
    about = "Serve typed snapshots of Uptime Kuma status pages",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default).
    Serve {
        /// Listen address (host:port).
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: String,
    },

    /// Resolve one page and print the render snapshot as JSON.
    Snapshot {
        /// Status page id. Defaults to the first configured page.
        #[arg(long)]
        page_id: Option<String>,
    },

    /// Fetch site metadata for every page and write the config file.
    GenerateConfig {
        /// Output path.
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = Arc::new(Settings::from_env()?);
    let transport = Arc::new(HttpClient::new(settings.transport));

    match cli.command {
        None => {
            let service = ConfigResolver::new(settings, transport);
            kuma_mieru_server::serve(DEFAULT_ADDR, Arc::new(AppState::new(service))).await?;
        }

        Some(Commands::Serve { addr }) => {
            let service = ConfigResolver::new(settings, transport);
            kuma_mieru_server::serve(&addr, Arc::new(AppState::new(service))).await?;
        }

        Some(Commands::Snapshot { page_id }) => {
            let service = ConfigResolver::new(settings, transport);
            if let Some(id) = page_id.as_deref() {
                service.page_config(Some(id))?;
            }
            let snapshot = service.render(page_id.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Some(Commands::GenerateConfig { output }) => {
            let resolver = PreloadResolver::new(transport);
            let overrides = FeatureOverrides::from_env();
            let generated = generate_config(&settings, &resolver, &overrides).await;
            write_generated_config(&generated, &output)?;
        }
    }

    Ok(())
}
