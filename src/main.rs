use anyhow::{anyhow, Result};
use std::{sync::Arc, time::Duration};

use kaze::{
    api::{
        modbus::{LoggingHook, ModbusSlaveBuilder},
        utils::open_serial_port,
    },
    boot, cli,
    core::FileSampleSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::parse_args();
    let config = cli::resolve_config(&matches)?;

    if matches.get_flag("dump-config") {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    boot::init_logging(config.log_file.as_deref());
    log::info!(
        "Starting Modbus RTU slave on {} (unit {}, {} baud)",
        config.port_name,
        config.slave.unit_id,
        config.baud_rate
    );

    let port = open_serial_port(
        &config.port_name,
        config.baud_rate,
        Duration::from_millis(config.read_timeout_ms),
    )?;
    let source = FileSampleSource::new(&config.sample_file);

    let slave = ModbusSlaveBuilder::from_config(config.slave.clone())
        .add_hook(Arc::new(LoggingHook))
        .build_slave(port, source)?;

    let control = slave.control();
    ctrlc::set_handler(move || {
        log::info!("Stop requested, finishing in-flight work");
        control.stop();
    })
    .map_err(|err| anyhow!("Failed to install Ctrl-C handler: {err}"))?;

    let result = slave.wait().await;
    match &result {
        Ok(()) => log::info!("Modbus RTU slave stopped"),
        Err(err) => log::error!("Modbus RTU slave failed: {err:#}"),
    }
    result
}
