//! Serial port configuration strings
//!
//! A device's connection is configured with a single string of the form `PORT:BAUD,PARITY,DATABITS,STOPBITS`,
//! e.g. `COM3:9600,N,8,1`. Everything after the port is optional and defaults to `9600,N,8,1`.

use std::{
    fmt,
    str::FromStr,
};
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity
{
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity
{
    fn letter(self) -> char
    {
        match self {
            Self::None => 'N',
            Self::Odd => 'O',
            Self::Even => 'E',
            Self::Mark => 'M',
            Self::Space => 'S',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits
{
    None,
    One,
    OnePointFive,
    Two,
}

impl StopBits
{
    fn notation(self) -> &'static str
    {
        match self {
            Self::None => "0",
            Self::One => "1",
            Self::OnePointFive => "1.5",
            Self::Two => "2",
        }
    }
}

/// A validated serial port configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings
{
    port_name: String,
    baud_rate: u32,
    parity: Parity,
    data_bits: u8,
    stop_bits: StopBits,
}

impl SerialSettings
{
    pub const DEFAULT_BAUD_RATE: u32 = 9600;
    pub const DEFAULT_DATA_BITS: u8 = 8;

    /// Builds settings from their parts
    ///
    /// The port must be either `COM<n>` with a positive `n` (spaces and a trailing colon are tolerated) or an
    /// absolute `/dev/` path. Data bits must be between 5 and 8.
    pub fn new(
        port_name: &str,
        baud_rate: u32,
        parity: Parity,
        data_bits: u8,
        stop_bits: StopBits,
    )
        -> Result<Self, Error>
    {
        let invalid = |reason| Error::InvalidSerialSettings {
            input: port_name.to_string(),
            reason: reason,
        };

        let port_name = normalize_port_name(port_name).map_err(invalid)?;

        if baud_rate == 0 {
            return Err(invalid("Baud rate must be positive."));
        }
        if !(5..=8).contains(&data_bits) {
            return Err(invalid("Unknown data bits value."));
        }

        Ok(Self {
            port_name: port_name,
            baud_rate: baud_rate,
            parity: parity,
            data_bits: data_bits,
            stop_bits: stop_bits,
        })
    }

    pub fn port_name(&self) -> &str
    {
        &self.port_name
    }

    pub fn baud_rate(&self) -> u32
    {
        self.baud_rate
    }

    pub fn parity(&self) -> Parity
    {
        self.parity
    }

    pub fn data_bits(&self) -> u8
    {
        self.data_bits
    }

    pub fn stop_bits(&self) -> StopBits
    {
        self.stop_bits
    }

    /// Whether this is the 9600 baud, no parity, 8 data bits, 1 stop bit framing
    pub fn is_9600_8n1(&self) -> bool
    {
        self.baud_rate == 9600
            && self.parity == Parity::None
            && self.data_bits == 8
            && self.stop_bits == StopBits::One
    }
}

impl Default for SerialSettings
{
    fn default() -> Self
    {
        Self {
            port_name: "COM1".to_string(),
            baud_rate: Self::DEFAULT_BAUD_RATE,
            parity: Parity::None,
            data_bits: Self::DEFAULT_DATA_BITS,
            stop_bits: StopBits::One,
        }
    }
}

/// Turns `com 3:` into `COM3` and checks `/dev/` paths are not empty
fn normalize_port_name(port_name: &str) -> Result<String, &'static str>
{
    let port_name = port_name.trim();

    if port_name.starts_with("/dev/") {
        return if port_name.len() > "/dev/".len() && !port_name.contains(char::is_whitespace) {
            Ok(port_name.to_string())
        }
        else {
            Err("Port path must name a device.")
        };
    }

    let number = match port_name.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("COM") => &port_name[3..],
        _ => return Err("Port name must start with COM."),
    };

    let number = number.strip_suffix(':').unwrap_or(number).trim();
    match number.parse::<i64>() {
        Ok(number) if number > 0 => Ok(format!("COM{}", number)),
        _ => Err("Port name must contain positive port number."),
    }
}

impl FromStr for SerialSettings
{
    type Err = Error;

    fn from_str(settings_str: &str) -> Result<Self, Self::Err>
    {
        let invalid = |reason| Error::InvalidSerialSettings {
            input: settings_str.to_string(),
            reason: reason,
        };

        let mut parts = settings_str.split(':');
        let port = parts.next().unwrap_or("");
        let aux = parts.next();
        if parts.next().is_some() {
            return Err(invalid("Too many ':' separators."));
        }

        let port = if port.is_empty() { "COM1" } else { port };
        let mut baud_rate = SerialSettings::DEFAULT_BAUD_RATE;
        let mut parity = Parity::None;
        let mut data_bits = SerialSettings::DEFAULT_DATA_BITS;
        let mut stop_bits = StopBits::One;

        if let Some(aux) = aux {
            let fields: Vec<String> = aux.split(',').map(|field| field.trim().to_ascii_uppercase()).collect();
            let field = |index: usize| fields.get(index).map(String::as_str).filter(|field| !field.is_empty());

            if let Some(baud) = field(0) {
                baud_rate = baud.parse().map_err(|_| invalid("Unknown baud rate."))?;
            }
            if let Some(parity_str) = field(1) {
                parity = match parity_str {
                    "N" => Parity::None,
                    "O" => Parity::Odd,
                    "E" => Parity::Even,
                    "M" => Parity::Mark,
                    "S" => Parity::Space,
                    _ => return Err(invalid("Unknown parity value.")),
                };
            }
            if let Some(bits) = field(2) {
                data_bits = bits.parse().map_err(|_| invalid("Unknown data bits value."))?;
            }
            if let Some(stop_str) = field(3) {
                stop_bits = match stop_str {
                    "0" => StopBits::None,
                    "1" => StopBits::One,
                    "1.5" => StopBits::OnePointFive,
                    "2" => StopBits::Two,
                    _ => return Err(invalid("Unknown stop bits value.")),
                };
            }
            if fields.len() > 4 {
                return Err(invalid("Too many fields."));
            }
        }

        SerialSettings::new(port, baud_rate, parity, data_bits, stop_bits).map_err(|err| match err {
            Error::InvalidSerialSettings { reason, .. } => invalid(reason),
            other => other,
        })
    }
}

impl fmt::Display for SerialSettings
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "{}:{},{},{},{}",
            self.port_name,
            self.baud_rate,
            self.parity.letter(),
            self.data_bits,
            self.stop_bits.notation()
        )
    }
}
