use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config_file::ConfigOverrides;
use crate::types::OwnerSpec;

/// stackrefresh - pull an image, prepare its data directory, restart the stack
#[derive(Parser, Debug)]
#[command(name = "stackrefresh")]
#[command(about = "Refresh a container-compose deployment: pull, prepare data dir, restart")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// Destructive steps (chown, stack stop/start, directory creation) are
    /// logged and skipped. The image pull still runs so the preview checks
    /// that the reference resolves.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// JSON configuration file; CLI flags override its values
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull the image, ensure the data directory and restart the stack
    Refresh(RefreshArgs),
    /// Print the resolved refresh plan without running it
    Plan(RefreshArgs),
    /// Check that every required tool is on PATH
    Check(RefreshArgs),
    /// Write a configuration file with default values
    InitConfig {
        /// Where to write the configuration
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Parameters shared by refresh, plan and check
#[derive(Args, Debug, Clone, Default)]
pub struct RefreshArgs {
    /// Image reference to pull
    #[arg(long, value_name = "REF")]
    pub image: Option<String>,

    /// Data directory to create and chown [default: ./data]
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Owner for the data directory, user or user:group [default: current uid:gid]
    #[arg(long, value_name = "USER:GROUP")]
    pub owner: Option<OwnerSpec>,

    /// Compose stack descriptor [default: ./docker-compose.yml]
    #[arg(long, value_name = "PATH")]
    pub compose_file: Option<PathBuf>,

    /// Kill any step still running after this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub step_timeout: Option<u64>,
}

impl RefreshArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            image: self.image.clone(),
            data_dir: self.data_dir.clone(),
            owner: self.owner.clone(),
            compose_file: self.compose_file.clone(),
            step_timeout_secs: self.step_timeout,
        }
    }
}
