//! Polls one multimeter and prints what it reads
//!
//! Usage:
//!   arcs-dmm --list
//!   arcs-dmm agilent-u1232a COM3:9600,N,8,1
//!   arcs-dmm scpi-dmm /dev/ttyUSB0 --interval 500 --json

use std::{
    process::ExitCode,
    time::Duration,
};
use clap::Parser;
use serde::Serialize;
use tokio::sync::broadcast::{ self, error::RecvError };
use tracing::{ error, info, warn };
use arcs_dmm::{ DriverRegistry, MeasurementUpdate, Poller };

#[derive(Parser, Debug)]
#[command(name = "arcs-dmm", about = "Poll a SCPI multimeter over a serial port")]
struct Args
{
    /// List the available drivers and exit
    #[arg(long)]
    list: bool,

    /// Driver key, see --list
    #[arg(required_unless_present = "list")]
    driver: Option<String>,

    /// Serial configuration, e.g. COM3:9600,N,8,1
    #[arg(required_unless_present = "list")]
    settings: Option<String>,

    /// Polling interval in milliseconds, overriding the driver's default
    #[arg(long)]
    interval: Option<u64>,

    /// Print one JSON object per update
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct UpdateRecord<'a>
{
    device: &'a str,
    time: Option<String>,
    measurement_type: Option<&'static str>,
    range: Option<String>,
    value: Option<String>,
    unit: Option<String>,
    overflow: bool,
    display: Option<String>,
}

impl <'a> From<&'a MeasurementUpdate> for UpdateRecord<'a>
{
    fn from(update: &'a MeasurementUpdate) -> Self
    {
        let measurement = update.measurement.as_ref();

        Self {
            device: &update.device,
            time: measurement.map(|m| m.time().to_rfc3339()),
            measurement_type: measurement.map(|m| m.measurement_type().key()),
            range: measurement.map(|m| m.range().to_string()),
            value: measurement.map(|m| m.value().to_string()),
            unit: measurement.map(|m| m.si_unit()),
            overflow: measurement.map_or(false, |m| m.is_overflow()),
            display: measurement.map(|m| m.to_string()),
        }
    }
}

fn print_update(update: &MeasurementUpdate, json: bool)
{
    if json {
        match serde_json::to_string(&UpdateRecord::from(update)) {
            Ok(line) => println!("{}", line),
            Err(err) => warn!(error = %err, "could not serialize update"),
        }
        return;
    }

    match &update.measurement {
        Some(measurement) => println!(
            "{} {}: {} [{}]",
            measurement.time().format("%H:%M:%S%.3f"),
            update.device,
            measurement,
            measurement.range()
        ),
        None => println!("{}: ---", update.device),
    }
}

#[tokio::main]
async fn main() -> ExitCode
{
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let registry = DriverRegistry::builtin();

    if args.list {
        for entry in registry.iter() {
            println!(
                "{:<16} {:<24} {}ms",
                entry.key,
                entry.capabilities.display_name(),
                entry.capabilities.update_interval.as_millis()
            );
        }
        return ExitCode::SUCCESS;
    }

    let (key, settings) = match (args.driver.as_deref(), args.settings.as_deref()) {
        (Some(key), Some(settings)) => (key, settings),
        _ => return ExitCode::FAILURE,
    };

    let driver = match registry.create(key, settings) {
        Ok(driver) => driver,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let name = format!("{} ({})", driver.capabilities().display_name(), settings);
    let (updates_tx, mut updates_rx) = broadcast::channel(16);
    let poller = Poller::spawn(name, driver, args.interval.map(Duration::from_millis), updates_tx);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("stopping");
                break;
            }
            update = updates_rx.recv() => match update {
                Ok(update) => print_update(&update, args.json),
                Err(RecvError::Lagged(skipped)) => warn!(skipped = skipped, "output fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    poller.stop();
    poller.join().await;

    ExitCode::SUCCESS
}
