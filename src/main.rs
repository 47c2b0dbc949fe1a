//! kubeplorer - ownership topology and GitOps Application lookup across
//! Kubernetes clusters

mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cli::{ConfigSubcommand, Session};
use kubeplorer::config::ConfigLoader;

/// Explore where Kubernetes objects sit in their deployment topology
#[derive(Parser, Debug)]
#[command(name = "kubeplorer", version)]
#[command(about = "Ownership chains and GitOps Application lookup across Kubernetes clusters", long_about = None)]
struct Args {
    /// Enable debug logging to a temp file
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Kubeconfig path (defaults to KUBECONFIG or ~/.kube/config)
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// List kubeconfig contexts with their namespace and reachability
    Contexts,
    /// List resource types a context can resolve
    ApiResources {
        context: String,
    },
    /// Print the dependency chain of one object as JSON
    Deps {
        context: String,
        /// Plural resource name, e.g. "deployments"
        resource: String,
        name: String,
        /// Namespace (defaults to the context's namespace)
        #[arg(long, short = 'n')]
        namespace: Option<String>,
    },
    /// Print the management cluster topology as JSON
    Topology,
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = cli::init_logging(args.debug)?;
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    if let Command::Config { subcommand } = &args.command {
        return cli::handle_config_command(subcommand);
    }

    let config = ConfigLoader::load().context("Failed to load configuration")?;
    tracing::debug!(
        request_timeout_secs = config.request_timeout_secs,
        gitops_namespace = %config.topology.gitops_namespace,
        eager_build = config.topology.eager_build,
        "Configuration loaded"
    );

    let session = Session::new(args.kubeconfig.as_deref(), &config)?;

    match args.command {
        Command::Contexts => cli::contexts(&session).await,
        Command::ApiResources { context } => cli::api_resources(&session, &context).await,
        Command::Deps {
            context,
            resource,
            name,
            namespace,
        } => cli::deps(&session, &context, &resource, &name, namespace.as_deref()).await,
        Command::Topology => cli::topology(&session).await,
        // handled before the kubeconfig is read
        Command::Config { .. } => Ok(()),
    }
}
