//! **A**synchronous-Rust **R**emote **C**ontrol for **S**CPI **DMM**s
//!
//! Polls digital multimeters over a serial line with SCPI queries and turns their replies into unit-aware
//! [`Measurement`]s.
//!
//! The layers, bottom up:
//!   - [`executor`] exchanges one command line for one reply line, serialized and bounded by a read timeout
//!   - [`protocol`] builds `*IDN?`, `READ?` and `CONF?` queries and decodes the replies
//!   - [`devices`] wraps the protocol into one handle per supported model
//!   - [`poller`] drives a handle from a background task and publishes what it reads
//!
//! ```no_run
//! use arcs_dmm::{ AgilentU1232A, Driver };
//!
//! # async fn run() -> Result<(), arcs_dmm::Error> {
//! let meter = AgilentU1232A::new("COM3:9600,N,8,1")?;
//! if meter.connect().await {
//!     if let Some(measurement) = meter.current_measurement().await {
//!         println!("{}", measurement);
//!     }
//!     meter.disconnect().await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cmd;
pub mod devices;
pub mod error;
pub mod executor;
pub mod identification;
pub mod measurement;
pub mod poller;
pub mod protocol;
pub mod registry;
pub mod settings;
pub mod units;

pub use devices::{ AgilentU1231A, AgilentU1232A, AgilentU1233A, ScpiDmm, Driver, DriverCapabilities, DriverInterface };
pub use error::Error;
pub use executor::{ Connector, ScpiTransport, SerialConnector };
pub use identification::{ FirmwareVersion, Identification };
pub use measurement::{
    scpi::{ parse_configuration, parse_reading, Reading },
    Measurement, MeasurementRange, MeasurementType,
};
pub use poller::{ ConnectionState, MeasurementUpdate, Poller };
pub use protocol::ScpiMultimeter;
pub use registry::{ DriverEntry, DriverFactory, DriverRegistry };
pub use settings::{ Parity, SerialSettings, StopBits };
pub use units::{ EngineeringNotation, SiPrefix };
