use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::scheduler::{DEFAULT_START_KEY, DEFAULT_STOP_KEY, DEFAULT_TAG_NAMESPACE};

#[derive(Debug, Parser)]
#[command(
    name = "oci-scripts",
    version,
    about = "OCI tenancy reports and tag-driven automation"
)]
pub struct Cli {
    /// Config file with the profiles (default ~/.oci/config)
    #[arg(short, long, global = true, env = "OCI_CONFIG_FILE")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List compartments as a tree with their full names.
    Compartments(CompartmentsArgs),
    /// Block storage (boot + block volumes) used per compartment.
    BlockStorage(BlockStorageArgs),
    /// Remove a defined tag key from a compute instance.
    RemoveTag(RemoveTagArgs),
    /// Start/stop autonomous databases whose schedule tags match the current UTC hour.
    /// Meant to run hourly from cron.
    AdbScheduler(AdbSchedulerArgs),
}

#[derive(Debug, Args)]
pub struct ProfileArg {
    /// Profile (section) name in the config file
    #[arg(value_name = "OCI_PROFILE", env = "OCI_PROFILE")]
    pub profile: String,
}

#[derive(Debug, Args)]
pub struct CompartmentsArgs {
    /// Also list deleted compartments
    #[arg(short, long)]
    pub deleted: bool,
    #[command(flatten)]
    pub profile: ProfileArg,
}

#[derive(Debug, Args)]
pub struct BlockStorageArgs {
    /// Process every subscribed region instead of the profile's region
    #[arg(short, long = "all-regions")]
    pub all_regions: bool,
    /// List every block and boot volume
    #[arg(short, long)]
    pub verbose: bool,
    #[command(flatten)]
    pub profile: ProfileArg,
}

#[derive(Debug, Args)]
pub struct RemoveTagArgs {
    #[command(flatten)]
    pub profile: ProfileArg,
    #[arg(value_name = "INSTANCE_OCID")]
    pub instance: String,
    #[arg(value_name = "TAG_NAMESPACE")]
    pub namespace: String,
    #[arg(value_name = "TAG_KEY")]
    pub key: String,
}

#[derive(Debug, Args)]
pub struct AdbSchedulerArgs {
    /// Process every subscribed region instead of the profile's region
    #[arg(short, long = "all-regions")]
    pub all_regions: bool,
    /// Actually stop databases (otherwise only listed)
    #[arg(long = "confirm-stop", alias = "confirm_stop")]
    pub confirm_stop: bool,
    /// Actually start databases (otherwise only listed)
    #[arg(long = "confirm-start", alias = "confirm_start")]
    pub confirm_start: bool,
    #[arg(long = "tag-namespace", default_value = DEFAULT_TAG_NAMESPACE)]
    pub tag_namespace: String,
    #[arg(long = "stop-key", default_value = DEFAULT_STOP_KEY)]
    pub stop_key: String,
    #[arg(long = "start-key", default_value = DEFAULT_START_KEY)]
    pub start_key: String,
    #[command(flatten)]
    pub profile: ProfileArg,
}
