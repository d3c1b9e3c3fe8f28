mod cli;
mod compartments;
mod config;
mod error;
mod models;
mod oci;
mod scheduler;
mod storage;
mod tags;

use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::OciConfig;
use crate::oci::OciClient;
use crate::scheduler::{Mode, SchedulerOptions, TagKeys};
use crate::storage::ReportOptions;

const USAGE_EXIT: u8 = 1;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(USAGE_EXIT),
            };
        }
    };

    if let Err(err) = init_tracing() {
        eprintln!("cannot initialise logging: {}", err);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("ERROR: {:#}", err);
            ExitCode::from(error::exit_code_for(&err))
        }
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = OciConfig::load(cli.config)?;
    match cli.command {
        Command::Compartments(args) => {
            let client = connect(&config, &args.profile.profile)?;
            compartments::list(&client, args.deleted).await
        }
        Command::BlockStorage(args) => {
            let client = connect(&config, &args.profile.profile)?;
            let options = ReportOptions {
                all_regions: args.all_regions,
                verbose: args.verbose,
            };
            storage::report(&client, options).await
        }
        Command::RemoveTag(args) => {
            let client = connect(&config, &args.profile.profile)?;
            tags::remove_from_instance(&client, &args.instance, &args.namespace, &args.key).await
        }
        Command::AdbScheduler(args) => {
            let client = connect(&config, &args.profile.profile)?;
            let options = SchedulerOptions {
                all_regions: args.all_regions,
                mode: Mode {
                    confirm_start: args.confirm_start,
                    confirm_stop: args.confirm_stop,
                },
                keys: TagKeys {
                    namespace: args.tag_namespace,
                    stop_key: args.stop_key,
                    start_key: args.start_key,
                },
            };
            scheduler::run(&client, options).await
        }
    }
}

fn connect(config: &OciConfig, profile_name: &str) -> Result<OciClient> {
    let profile = config.profile(profile_name)?;
    tracing::info!(profile = %profile.name, region = %profile.region, "using profile");
    OciClient::new(profile)
}
