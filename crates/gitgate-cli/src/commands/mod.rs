//! Command definitions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use gitgate_git::{GitCli, GitClient};
use gitgate_rpc::config::CONFIG_FILE;
use gitgate_rpc::{GatewayConfig, OperationRegistry, RpcGateway};
use tracing::debug;

pub mod call;
pub mod completions;
pub mod serve;
pub mod status;

#[derive(Parser)]
#[command(name = "gitgate")]
#[command(about = "Rate-limited, validated JSON bridge to git rebase, cherry-pick and revert")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer newline-delimited JSON requests on stdin
    Serve {
        #[command(flatten)]
        repo: RepoArgs,
    },

    /// Send a single request and print the response
    Call {
        /// Method name, e.g. git.cherryPick
        method: String,

        /// Positional parameters as a JSON array
        params: Option<String>,

        #[command(flatten)]
        repo: RepoArgs,
    },

    /// Show which sequential operation git has in progress
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        repo: RepoArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Repository to operate on (defaults to the current directory)
    #[arg(long, short = 'C', default_value = ".")]
    pub repo: PathBuf,

    /// Gateway config file (defaults to .git/gitgate.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl RepoArgs {
    pub fn open(&self) -> Result<GitCli> {
        GitCli::open(&self.repo).context("Not inside a git repository")
    }
}

/// Open the repository and build a gateway with every operation registered.
pub fn gateway(args: &RepoArgs) -> Result<RpcGateway> {
    let git = Arc::new(args.open()?);
    let config = load_config(args.config.as_deref(), git.git_dir())?;

    let mut gateway = RpcGateway::new(&config);
    OperationRegistry::new(git).register(&mut gateway)?;
    Ok(gateway)
}

fn load_config(explicit: Option<&Path>, git_dir: &Path) -> Result<GatewayConfig> {
    let path = explicit.map_or_else(|| git_dir.join(CONFIG_FILE), Path::to_path_buf);
    debug!(path = %path.display(), "loading config");
    GatewayConfig::load(&path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Single-threaded runtime; handlers only ever wait on git.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}
