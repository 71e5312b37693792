pub mod config;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub use config::SlaveBootConfig;

pub fn build_command() -> Command {
    Command::new("kaze")
        .about("Modbus RTU slave serving weather-station readings as holding registers")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file (.json or .toml)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Serial port to listen on")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("baud-rate")
                .long("baud-rate")
                .help("Serial port baud rate")
                .value_name("BAUD")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("unit-id")
                .long("unit-id")
                .help("Modbus unit id (slave address) answered by this slave")
                .value_name("ID")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("registers")
                .long("registers")
                .help("Number of holding registers exposed")
                .value_name("COUNT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("refresh-interval")
                .long("refresh-interval")
                .help("Seconds between register refreshes")
                .value_name("SECS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("sample-file")
                .long("sample-file")
                .help("File the weather logger appends readings to")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Also write logs to this file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("dump-config")
                .long("dump-config")
                .help("Print the effective configuration as TOML and exit")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    build_command().get_matches()
}

/// Load the config file (if any) and apply command line overrides on top.
pub fn resolve_config(matches: &ArgMatches) -> Result<SlaveBootConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SlaveBootConfig::from_file(path)?,
        None => SlaveBootConfig::default(),
    };

    if let Some(port) = matches.get_one::<String>("port") {
        config.port_name = port.clone();
    }
    if let Some(baud_rate) = matches.get_one::<u32>("baud-rate") {
        config.baud_rate = *baud_rate;
    }
    if let Some(unit_id) = matches.get_one::<u8>("unit-id") {
        config.slave.unit_id = *unit_id;
    }
    if let Some(count) = matches.get_one::<u16>("registers") {
        config.slave.register_count = *count;
    }
    if let Some(secs) = matches.get_one::<u64>("refresh-interval") {
        config.slave.refresh_interval_ms = secs.saturating_mul(1000);
    }
    if let Some(path) = matches.get_one::<PathBuf>("sample-file") {
        config.sample_file = path.clone();
    }
    if let Some(path) = matches.get_one::<String>("log-file") {
        config.log_file = Some(path.clone());
    }

    config.slave.validate()?;
    Ok(config)
}
