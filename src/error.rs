//! Configuration errors
//!
//! Only mistakes made while building something end up here. Talking to a meter never produces one of
//! these: a device that does not answer is reported as "no response" and a reply that cannot be interpreted is
//! reported as the most conservative value available.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error
{
    /// The serial configuration string could not be parsed
    #[error("Input string ({input}) is not in valid format. {reason}")]
    InvalidSerialSettings
    {
        input: String,
        reason: &'static str,
    },
    /// The serial configuration is well formed but the driver cannot talk over it
    #[error("Device only supports {expected}, got {actual}")]
    UnsupportedSerialSettings
    {
        expected: &'static str,
        actual: String,
    },
    /// A measurement range was asked to span a window whose maximum is below its minimum
    #[error("Maximum exponent ({max}) must be larger than or equal to minimum ({min})")]
    InvalidExponentWindow
    {
        min: i32,
        max: i32,
    },
    #[error("Resolution cannot be negative ({0})")]
    NegativeResolution(Decimal),
    #[error("No driver registered under '{0}'")]
    UnknownDriver(String),
    #[error("'{0}' is not a valid firmware version")]
    InvalidVersion(String),
}
