use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use fleetmon::common::config::{DEFAULT_SUSPEND_CONFIG_PATH, SuspendConfig};
use fleetmon::common::heartbeat::is_heartbeat_valid;
use fleetmon::common::setup::setup_logging;
use fleetmon::common::timeutils::now_utc;
use fleetmon::event::{ClusterEventPublisher, LogEventSink};
use fleetmon::hostlist;

const HEARTBEAT_ERROR_MESSAGE: &str = "No valid clustermgtd heartbeat detected, clustermgtd is down! \
Please check clustermgtd log for error.\n\
Nodes will be reset to POWER_SAVE state after SuspendTimeout. \
The backing EC2 instances may not be correctly terminated.\n\
Please check and terminate any orphaned instances in EC2!";

/// Releases Slurm nodes. Backing instances are cleaned up by clustermgtd.
#[derive(Parser)]
#[command(author, version = fleetmon::FLEETMON_VERSION, about)]
struct SuspendOpts {
    /// Nodes to release, in Slurm hostlist notation
    nodes: String,

    /// Path to the suspend program configuration
    #[arg(long, env = "CONFIG_FILE", default_value = DEFAULT_SUSPEND_CONFIG_PATH)]
    config: PathBuf,

    /// Enables more verbose logging
    #[arg(long)]
    debug: bool,
}

fn run(opts: SuspendOpts) -> anyhow::Result<bool> {
    let config = SuspendConfig::load(&opts.config)?;
    let publisher = ClusterEventPublisher::with_config(
        LogEventSink::new(
            &config.cluster_name,
            "HeadNode",
            "slurm-suspend",
            &config.instance_id,
        ),
        config.publisher_config(),
    );

    log::info!(
        "Suspending following nodes. Clustermgtd will cleanup orphaned instances: {}",
        opts.nodes
    );
    let nodes = match hostlist::expand_to_vec(&opts.nodes) {
        Ok(nodes) => nodes,
        Err(error) => {
            let message = format!("Cannot parse node list `{}`: {error}", opts.nodes);
            log::error!("{message}");
            publisher.publish_suspend_error_events(&message, &opts.nodes, &[]);
            return Ok(false);
        }
    };

    let heartbeat_valid = is_heartbeat_valid(
        now_utc(),
        config.clustermgtd_timeout(),
        &config.clustermgtd_heartbeat_file_path,
    )
    .unwrap_or_else(|error| {
        log::error!("Unable to retrieve clustermgtd heartbeat: {error}");
        false
    });

    if heartbeat_valid {
        log::info!("SuspendProgram finished. Nodes will be available after SuspendTimeout");
        publisher.publish_suspend_events(&opts.nodes, &nodes);
    } else {
        log::error!("{HEARTBEAT_ERROR_MESSAGE}");
        publisher.publish_suspend_error_events(HEARTBEAT_ERROR_MESSAGE, &opts.nodes, &nodes);
    }
    Ok(true)
}

fn main() -> ExitCode {
    let opts = SuspendOpts::parse();
    setup_logging(opts.debug);
    log::info!("SuspendProgram startup.");

    match run(opts) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            log::error!("{error:?}");
            ExitCode::FAILURE
        }
    }
}
