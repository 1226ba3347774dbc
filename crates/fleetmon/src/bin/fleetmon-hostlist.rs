use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

use fleetmon::common::setup::setup_logging;
use fleetmon::hostlist;

/// Expands a Slurm hostlist expression into one node name per line.
#[derive(Parser)]
#[command(author, version = fleetmon::FLEETMON_VERSION, about)]
struct HostlistOpts {
    /// Hostlist expression, e.g. `queue1-dy-c5-[1-3,7],queue2-st-t2-5`
    nodes: String,

    /// Enables more verbose logging
    #[arg(long)]
    debug: bool,
}

fn print_names(spec: &str) -> anyhow::Result<usize> {
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    let mut count = 0;
    for name in hostlist::expand(spec) {
        writeln!(stdout, "{}", name?)?;
        count += 1;
    }
    Ok(count)
}

fn main() -> ExitCode {
    let opts = HostlistOpts::parse();
    setup_logging(opts.debug);

    match print_names(&opts.nodes) {
        Ok(count) => {
            log::debug!("Expanded {count} node name(s)");
            ExitCode::SUCCESS
        }
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}
