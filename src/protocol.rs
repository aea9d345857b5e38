//! SCPI multimeter query protocol
//!
//! Turns `*IDN?`, `CONF?` and `READ?` exchanges into typed values. Every query is infallible: a missing or
//! malformed reply becomes the most conservative value available.

use std::sync::Mutex;
use tracing::debug;
use crate::{
    cmd::CmdSet,
    executor::{ Connector, ScpiTransport },
    identification::Identification,
    measurement::{
        scpi::{ parse_configuration, parse_reading },
        Measurement, MeasurementRange, MeasurementType,
    },
};

/// How many `READ?`/`CONF?` pairs one measurement request may spend looking for a consistent answer
const MEASUREMENT_ATTEMPTS: usize = 2;

/// A meter speaking the common SCPI multimeter dialect
pub struct ScpiMultimeter<C>
    where C: Connector
{
    transport: ScpiTransport<C>,
    // type observed by the previous measurement attempt
    last_type: Mutex<MeasurementType>,
}

impl <C> ScpiMultimeter<C>
    where C: Connector
{
    pub fn new(transport: ScpiTransport<C>) -> Self
    {
        Self {
            transport: transport,
            last_type: Mutex::new(MeasurementType::Unknown),
        }
    }

    pub fn transport(&self) -> &ScpiTransport<C>
    {
        &self.transport
    }

    pub async fn connect(&self) -> bool
    {
        self.transport.connect().await
    }

    pub async fn disconnect(&self)
    {
        self.transport.disconnect().await
    }

    pub fn is_connected(&self) -> bool
    {
        self.transport.is_connected()
    }

    pub async fn identification(&self) -> Identification
    {
        let response = self.transport.send_command(CmdSet::Identify).await;
        Identification::parse(response.as_deref())
    }

    pub async fn measurement_range(&self) -> MeasurementRange
    {
        let response = self.transport.send_command(CmdSet::Configuration).await;
        parse_configuration(response.as_deref())
    }

    /// Reads the display and the range it was taken on
    ///
    /// The meter may be switched between the `READ?` and the `CONF?`, in which case the value would be
    /// attributed to the wrong quantity. A reading is only accepted when the type it resolves to matches the type
    /// seen by the previous attempt; otherwise it is discarded and the pair is sent again. The remembered type
    /// is updated on every attempt, so after a switch the second attempt is accepted unless the meter is still
    /// changing, in which case no measurement is returned for this call. A lost reading still sends `CONF?` and
    /// updates the remembered type before giving up.
    pub async fn current_measurement(&self) -> Option<Measurement>
    {
        for attempt in 1..=MEASUREMENT_ATTEMPTS {
            let reading = parse_reading(self.transport.send_command(CmdSet::Read).await.as_deref());
            let range = self.measurement_range().await;

            // type memory follows the meter even when the reading is lost
            let previous = self.swap_last_type(range.measurement_type());
            let reading = reading?;
            if previous == range.measurement_type() {
                return Some(Measurement::with_range(reading.value(), range));
            }

            debug!(
                attempt = attempt,
                previous = %previous,
                current = %range.measurement_type(),
                "measurement type changed, discarding reading"
            );
        }

        None
    }

    fn swap_last_type(&self, measurement_type: MeasurementType) -> MeasurementType
    {
        // a poisoned lock still holds a valid type
        let mut last_type = match self.last_type.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        std::mem::replace(&mut *last_type, measurement_type)
    }
}
