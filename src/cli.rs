// Licensed under the Open Software License version 3.0
use crate::config::types::Transport;
use clap::Parser;
use std::{path::PathBuf, time::Duration};

/// Collects sensor readings from BMCs over IPMI or Redfish
#[derive(Debug, Parser)]
#[command(name = "bmc-telemetry", version, about)]
pub struct Args {
    /// INI file with the [bmc] section and optional tuning sections
    #[arg(long, env = "BMC_TELEMETRY_CONFIG_FILE", default_value = "config.ini")]
    pub config: PathBuf,

    /// Overrides the transport of every target
    #[arg(long, value_enum)]
    pub transport: Option<Transport>,

    /// Collect every target once, print and exit
    #[arg(long, conflicts_with = "interval")]
    pub once: bool,

    /// Delay between successful collections, e.g. "30s" or "2m"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Print snapshots as JSON lines instead of pipe tables
    #[arg(long)]
    pub json: bool,

    /// Write an example config to --config if it does not exist and exit
    #[arg(long, conflicts_with_all = ["once", "interval"])]
    pub init: bool,
}
