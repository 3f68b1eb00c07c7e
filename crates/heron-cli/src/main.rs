mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

#[derive(Parser)]
#[command(name = "heron", author, version, about = "Manage agent runtime endpoints")]
struct Cli {
    /// AWS region hosting the agent runtime
    #[arg(long, global = true, default_value = "eu-central-1")]
    region: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new endpoint pointing at a runtime version
    Create {
        /// Agent runtime id (e.g. researchAgent-71evTo5Zf8)
        #[arg(long)]
        agent_runtime_id: String,
        /// Endpoint name (e.g. dev, staging, prod)
        #[arg(long)]
        name: String,
        /// Version number to point to; omit for the latest version
        #[arg(long)]
        version: Option<String>,
        /// Description of the endpoint
        #[arg(long)]
        description: Option<String>,
        /// Tags as KEY=VALUE (can be used multiple times)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Point an existing endpoint at a different runtime version
    Update {
        #[arg(long)]
        agent_runtime_id: String,
        /// Endpoint name (e.g. dev, DEFAULT)
        #[arg(long)]
        endpoint_name: String,
        /// Version number to deploy
        #[arg(long)]
        version: String,
    },
    /// Show details of a specific endpoint
    Get {
        #[arg(long)]
        agent_runtime_id: String,
        #[arg(long)]
        endpoint_name: String,
    },
    /// List all endpoints of an agent runtime
    List {
        #[arg(long)]
        agent_runtime_id: String,
    },
    /// Delete an endpoint
    Delete {
        #[arg(long)]
        agent_runtime_id: String,
        #[arg(long)]
        endpoint_name: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{} Error: {}", style("✗").red(), err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = commands::endpoint::client(&cli.region).await;

    match &cli.command {
        Command::Create {
            agent_runtime_id,
            name,
            version,
            description,
            tags,
        } => {
            commands::endpoint::create(
                &client,
                agent_runtime_id,
                name,
                version.as_deref(),
                description.as_deref(),
                tags,
            )
            .await
        }
        Command::Update {
            agent_runtime_id,
            endpoint_name,
            version,
        } => commands::endpoint::update(&client, agent_runtime_id, endpoint_name, version).await,
        Command::Get {
            agent_runtime_id,
            endpoint_name,
        } => commands::endpoint::get(&client, agent_runtime_id, endpoint_name).await,
        Command::List { agent_runtime_id } => {
            commands::endpoint::list(&client, agent_runtime_id).await
        }
        Command::Delete {
            agent_runtime_id,
            endpoint_name,
        } => commands::endpoint::delete(&client, agent_runtime_id, endpoint_name).await,
    }
}
