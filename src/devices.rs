//! Device definition and APIs
//!
//! # Purpose
//! This module defines a handle per supported meter model. Every handle speaks the same SCPI dialect through
//! [`ScpiMultimeter`] and implements the object-safe [`Driver`] contract, so a poller or registry can hold any
//! of them as a `Box<dyn Driver>`.
//!
//! # Device Differences
//! Models differ only in what they declare about themselves:
//!   - **Capabilities**. Manufacturer, model, the interface needed to reach the device, and how often it should
//!     be polled.
//!   - **Supported measurements**. The quantities the model can be switched to.
//!   - **Model verification**. Model-specific drivers ask the device to identify itself on connect and hang up
//!     if somebody else answers. This keeps two different meters cross-wired on the wrong ports from being read
//!     with each other's driver.
//!
//! # Supported Devices
//!   - Agilent U1231A
//!   - Agilent U1232A
//!   - Agilent U1233A
//!   - Any other SCPI multimeter answering `READ?` and `CONF?` the same way, without model verification
//!
//! ## What if my device isn't supported?
//! If it speaks the same dialect, the generic [`ScpiDmm`] handle will drive it. Adding a verified model is one
//! more `define_device!` invocation.

use std::{
    fmt,
    time::Duration,
};
use async_trait::async_trait;
use crate::{
    identification::Identification,
    measurement::{ Measurement, MeasurementType },
};

/// How a driver reaches its device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverInterface
{
    /// Nothing to configure
    None,
    /// A serial port configuration string
    Serial,
}

/// What a driver declares about the devices it handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCapabilities
{
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub interface: DriverInterface,
    pub update_interval: Duration,
}

impl DriverCapabilities
{
    pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(1000);

    /// Manufacturer and model, or just the model when the manufacturer is blank
    pub fn display_name(&self) -> String
    {
        if self.manufacturer.is_empty() {
            self.model.to_string()
        }
        else {
            format!("{} {}", self.manufacturer, self.model)
        }
    }
}

impl fmt::Display for DriverCapabilities
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.display_name())
    }
}

/// A connectable meter
///
/// None of these calls fail. A device that cannot be reached is reported as disconnected, a query it does not
/// answer as `None` or an empty [`Identification`].
///
/// # Cancel Safety
/// Queries are bounded by the transport's read timeout and may be dropped at any await point. A reply arriving
/// after its query was abandoned is discarded before the next command is sent.
#[async_trait]
pub trait Driver: Send + Sync
{
    fn capabilities(&self) -> &'static DriverCapabilities;

    fn supported_measurements(&self) -> &'static [MeasurementType];

    /// Opens the link. Returns whether the device is connected afterwards.
    async fn connect(&self) -> bool;

    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    async fn identification(&self) -> Identification;

    async fn current_measurement(&self) -> Option<Measurement>;
}

macro_rules! impl_device
{
    (update_interval) => { crate::devices::DriverCapabilities::DEFAULT_UPDATE_INTERVAL };
    (update_interval $millis:literal) => { std::time::Duration::from_millis($millis) };
    {connect No $model:literal} => {
        async fn open(&self) -> bool
        {
            self.meter.connect().await
        }
    };
    {connect Yes $model:literal} => {
        /// Connects and checks the device identifies as this model, disconnecting again if it does not
        async fn open(&self) -> bool
        {
            if !self.meter.connect().await {
                return false;
            }

            let id = self.meter.identification().await;
            if id.model.as_deref() != Some($model) {
                tracing::warn!(expected = $model, actual = ?id.model, "wrong model on port, disconnecting");
                self.meter.disconnect().await;
                return false;
            }

            true
        }
    };
}

/// Defines a SCPI multimeter driver by its capabilities and supported measurements
///
/// Invoke inside a module named after the model, e.g. `agilent_u1232a`. The module gets a `Device` handle plus
/// `CAPABILITIES` and `SUPPORTED_MEASUREMENTS` statics usable without an instance.
macro_rules! define_device
{
    {
        $(#[$meta:meta])*
        manufacturer: $manufacturer:literal,
        model: $model:literal,
        verify_model: $verify:ident,
        $(update_interval_ms: $interval:literal,)?
        supported_measurements: [$($kind:ident),+ $(,)?]
    } => {
        use async_trait::async_trait;
        use crate::{
            devices::{ Driver, DriverCapabilities, DriverInterface },
            error::Error,
            executor::{ Connector, ScpiTransport, SerialConnector },
            identification::Identification,
            measurement::{ Measurement, MeasurementType },
            protocol::ScpiMultimeter,
        };

        pub static CAPABILITIES: DriverCapabilities = DriverCapabilities {
            manufacturer: $manufacturer,
            model: $model,
            interface: DriverInterface::Serial,
            update_interval: impl_device!(update_interval $($interval)?),
        };

        pub static SUPPORTED_MEASUREMENTS: &[MeasurementType] = &[$(MeasurementType::$kind),+];

        $(#[$meta])*
        pub struct Device<C = SerialConnector>
            where C: Connector
        {
            meter: ScpiMultimeter<C>,
        }

        impl Device<SerialConnector>
        {
            /// Construct a handle for the serial port described by `settings`, e.g. `COM3:9600,N,8,1`
            ///
            /// Nothing is opened until [`Driver::connect`] is called.
            pub fn new(settings: &str) -> Result<Self, Error>
            {
                Ok(Self::with_connector(SerialConnector::new(settings)?))
            }
        }

        impl <C> Device<C>
            where C: Connector
        {
            pub fn with_connector(connector: C) -> Self
            {
                Self::with_transport(ScpiTransport::new(connector))
            }

            pub fn with_transport(transport: ScpiTransport<C>) -> Self
            {
                Device {
                    meter: ScpiMultimeter::new(transport),
                }
            }

            pub fn meter(&self) -> &ScpiMultimeter<C>
            {
                &self.meter
            }

            impl_device!{connect $verify $model}
        }

        #[async_trait]
        impl <C> Driver for Device<C>
            where C: Connector
        {
            fn capabilities(&self) -> &'static DriverCapabilities
            {
                &CAPABILITIES
            }

            fn supported_measurements(&self) -> &'static [MeasurementType]
            {
                SUPPORTED_MEASUREMENTS
            }

            async fn connect(&self) -> bool
            {
                self.open().await
            }

            async fn disconnect(&self)
            {
                self.meter.disconnect().await
            }

            fn is_connected(&self) -> bool
            {
                self.meter.is_connected()
            }

            async fn identification(&self) -> Identification
            {
                self.meter.identification().await
            }

            async fn current_measurement(&self) -> Option<Measurement>
            {
                self.meter.current_measurement().await
            }
        }
    }
}

pub mod agilent_u1231a
{
    define_device!{
        /// A connected Agilent U1231A handheld multimeter
        ///
        /// Measures voltage, resistance, and capacitance
        manufacturer: "Agilent",
        model: "U1231A",
        verify_model: Yes,
        supported_measurements: [VoltageAC, VoltageDC, Resistance, Capacitance]
    }
}

pub mod agilent_u1232a
{
    define_device!{
        /// A connected Agilent U1232A handheld multimeter
        manufacturer: "Agilent",
        model: "U1232A",
        verify_model: Yes,
        supported_measurements: [VoltageAC, VoltageDC, Resistance, Capacitance, CurrentDC, CurrentAC]
    }
}

pub mod agilent_u1233a
{
    define_device!{
        /// A connected Agilent U1233A handheld multimeter
        manufacturer: "Agilent",
        model: "U1233A",
        verify_model: Yes,
        supported_measurements: [VoltageAC, VoltageDC, Resistance, Capacitance, CurrentDC, CurrentAC]
    }
}

pub mod scpi_dmm
{
    define_device!{
        /// Any multimeter speaking the common SCPI dialect
        ///
        /// Whatever answers on the port is accepted.
        manufacturer: "",
        model: "SCPI Multimeter",
        verify_model: No,
        update_interval_ms: 1000,
        supported_measurements: [
            VoltageDC, VoltageAC, Resistance, Diode, Capacitance, CurrentDC, CurrentAC, Frequency, Temperature,
        ]
    }
}

pub use agilent_u1231a::Device as AgilentU1231A;
pub use agilent_u1232a::Device as AgilentU1232A;
pub use agilent_u1233a::Device as AgilentU1233A;
pub use scpi_dmm::Device as ScpiDmm;

#[cfg(test)]
mod tests
{
    use std::time::Duration;
    use super::{ agilent_u1231a, agilent_u1232a, scpi_dmm, DriverCapabilities, DriverInterface };
    use crate::measurement::MeasurementType;

    #[test]
    fn capabilities()
    {
        assert_eq!(agilent_u1231a::CAPABILITIES.display_name(), "Agilent U1231A");
        assert_eq!(agilent_u1231a::CAPABILITIES.interface, DriverInterface::Serial);
        assert_eq!(agilent_u1231a::CAPABILITIES.update_interval, DriverCapabilities::DEFAULT_UPDATE_INTERVAL);
        assert_eq!(scpi_dmm::CAPABILITIES.display_name(), "SCPI Multimeter");
        assert_eq!(scpi_dmm::CAPABILITIES.update_interval, Duration::from_secs(1));
    }

    #[test]
    fn supported_measurements()
    {
        assert_eq!(agilent_u1231a::SUPPORTED_MEASUREMENTS.len(), 4);
        assert!(!agilent_u1231a::SUPPORTED_MEASUREMENTS.contains(&MeasurementType::CurrentDC));
        assert!(agilent_u1232a::SUPPORTED_MEASUREMENTS.contains(&MeasurementType::CurrentAC));

        let generic: Vec<_> = MeasurementType::ALL[1..].to_vec();
        assert_eq!(scpi_dmm::SUPPORTED_MEASUREMENTS, &generic[..]);
    }

    #[test]
    fn construction_validates_settings()
    {
        assert!(super::AgilentU1232A::new("COM3:9600,N,8,1").is_ok());
        assert!(super::AgilentU1232A::new("COM3:19200,N,8,1").is_err());
        assert!(super::ScpiDmm::new("COMX").is_err());
    }
}
