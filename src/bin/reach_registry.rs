//! Reach Registry CLI (C14) — a thin demo binary exercising the facade.

use clap::{Parser, Subcommand};
use reach_registry::{Registry, RegistryConfig};

#[derive(Parser)]
#[command(name = "reach-registry")]
#[command(version)]
#[command(about = "Connector marketplace registry CLI", long_about = None)]
struct Cli {
    /// Root directory holding index.json, trusted_keys.json, and the lockfile.
    #[arg(long, default_value = ".")]
    root: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists installed connectors/templates/policies.
    List,
    /// Lists raw package ids available from the index.
    Available,
    /// Installs a package without the consent flow (legacy single-phase path).
    Install {
        id: String,
        #[arg(long, default_value = ">=0.0.0")]
        version: String,
        #[arg(long, default_value_t = false)]
        allow_upgrade: bool,
    },
    /// Removes an installed package.
    Uninstall { id: String },
    /// Prints the marketplace catalog.
    Catalog {
        #[arg(long)]
        q: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();

    let cli = Cli::parse();
    let config = RegistryConfig::rooted_at(&cli.root);
    let registry = Registry::open(config)?;

    match cli.command {
        Commands::List => {
            let installed = registry.list_installed().await;
            for conn in installed {
                println!("{}@{} (verified_by={})", conn.id, conn.pinned_version, conn.verified_by);
            }
        }
        Commands::Available => {
            let ids = registry.available().await?;
            for id in ids {
                println!("{id}");
            }
        }
        Commands::Install { id, version, allow_upgrade } => {
            let conn = registry.install(&id, &version, allow_upgrade).await?;
            println!("installed {}@{}", conn.id, conn.pinned_version);
        }
        Commands::Uninstall { id } => {
            registry.uninstall(&id).await?;
            println!("uninstalled {id}");
        }
        Commands::Catalog { q, page } => {
            let mut filter = reach_registry::catalog::CatalogFilter::new();
            filter.q = q;
            filter.page = page;
            let page = registry.list_marketplace_catalog(&filter).await?;
            for item in &page.items {
                println!("{} [{}] {}", item.id, item.kind, item.latest_version);
            }
            println!("({} of {} total)", page.items.len(), page.total);
        }
    }

    Ok(())
}
