mod client;
mod commands;
mod package;
mod ui;

use clap::{Parser, Subcommand};
use exitflow_core::region;

#[derive(Parser)]
#[command(name = "exitflow")]
#[command(about = "On-demand ephemeral Tailscale exit nodes on AWS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the control plane (idempotent — creates only what's missing)
    Deploy {
        /// Control-plane region (friendly name, e.g. ohio)
        #[arg(short, long, env = "EXITFLOW_REGION", default_value = "ohio")]
        region: String,
    },
    /// Show control-plane status
    Status {
        /// Control-plane region (friendly name, e.g. ohio)
        #[arg(short, long, env = "EXITFLOW_REGION", default_value = "ohio")]
        region: String,
    },
    /// Tear down the control plane (asks for confirmation)
    Teardown {
        /// Control-plane region (friendly name, e.g. ohio)
        #[arg(short, long, env = "EXITFLOW_REGION", default_value = "ohio")]
        region: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Configure Tailscale for exit nodes (ACL + auth key, one-time)
    Setup {
        /// Your tailnet name (e.g. yourname@github or example.com)
        #[arg(long)]
        tailnet: String,
        /// Check configuration status without making changes
        #[arg(long)]
        status: bool,
        /// Preview ACL changes without applying them
        #[arg(long)]
        show_acl_changes: bool,
        /// Skip ACL configuration
        #[arg(long)]
        skip_acl: bool,
        /// Skip auth key creation
        #[arg(long)]
        skip_auth_key: bool,
    },
    /// Start an exit node in a region
    Start {
        /// Region friendly name (e.g. ohio, frankfurt)
        region: String,
    },
    /// Stop exit nodes in a region
    Stop {
        /// Region friendly name (e.g. ohio, frankfurt)
        region: String,
    },
    /// List exit node instances in a region
    Instances {
        /// Region friendly name (e.g. ohio, frankfurt)
        region: String,
    },
    /// Force-clean orphaned exit-node resources in a region
    Cleanup {
        /// Region friendly name (e.g. ohio, frankfurt)
        region: String,
    },
    /// Stop exit nodes in ALL regions
    Shutdown,
    /// Check control API health
    Health,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy { region } => commands::deploy::handle(&region).await,
        Commands::Status { region } => commands::status::handle(&region).await,
        Commands::Teardown { region, yes } => commands::teardown::handle(&region, yes).await,
        Commands::Setup {
            tailnet,
            status,
            show_acl_changes,
            skip_acl,
            skip_auth_key,
        } => {
            commands::setup::handle(commands::setup::SetupArgs {
                tailnet,
                status,
                show_acl_changes,
                skip_acl,
                skip_auth_key,
            })
            .await
        }
        Commands::Start { region } => commands::node::start(&region).await,
        Commands::Stop { region } => commands::node::stop(&region).await,
        Commands::Instances { region } => commands::node::instances(&region).await,
        Commands::Cleanup { region } => commands::node::cleanup(&region).await,
        Commands::Shutdown => commands::node::shutdown().await,
        Commands::Health => commands::node::health().await,
        Commands::Version => {
            println!("exitflow {}", env!("CARGO_PKG_VERSION"));
            println!("available regions: {}", region::available_regions());
            Ok(())
        }
    }
}
