//! Device identification reported by `*IDN?`

use std::{
    fmt,
    str::FromStr,
};
use crate::error::Error;

/// Firmware version in `major.minor[.build[.revision]]` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FirmwareVersion
{
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
}

impl FromStr for FirmwareVersion
{
    type Err = Error;

    fn from_str(version_str: &str) -> Result<Self, Self::Err>
    {
        let invalid = || Error::InvalidVersion(version_str.to_string());
        let mut parts = Vec::with_capacity(4);

        for part in version_str.split('.') {
            let part = part.trim();
            if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(invalid());
            }
            parts.push(part.parse::<u32>().map_err(|_| invalid())?);
        }

        if parts.len() < 2 || parts.len() > 4 {
            return Err(invalid());
        }

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            build: parts.get(2).copied(),
            revision: parts.get(3).copied(),
        })
    }
}

impl fmt::Display for FirmwareVersion
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}.{}", self.major, self.minor)?;

        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{}", revision)?;
        }

        Ok(())
    }
}

/// Who a device says it is
///
/// Every field is optional. A missing field means it could not be determined, not that something went wrong.
/// When a reply cannot be split into its fields it is kept verbatim in `comment`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identification
{
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub firmware_version: Option<FirmwareVersion>,
    pub comment: Option<String>,
}

impl Identification
{
    /// Interprets a `*IDN?` reply of the form `manufacturer,model,serial,Vfirmware`
    pub fn parse(response: Option<&str>) -> Self
    {
        let response = match response {
            Some(response) => response,
            None => return Self::default(),
        };

        let parts: Vec<&str> = response.split(',').collect();
        if parts.len() != 4 {
            return Self {
                comment: Some(response.to_string()),
                ..Self::default()
            };
        }

        let firmware = parts[3].trim();
        let firmware_version = firmware
            .strip_prefix('V')
            .and_then(|version| version.parse::<FirmwareVersion>().ok());

        Self {
            manufacturer: Some(parts[0].trim().to_string()),
            model: Some(parts[1].trim().to_string()),
            serial: Some(parts[2].trim().to_string()),
            firmware_version: firmware_version,
            comment: match firmware_version {
                Some(_) => None,
                None => Some(firmware.to_string()),
            },
        }
    }
}

impl fmt::Display for Identification
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match (&self.manufacturer, &self.model) {
            (Some(manufacturer), Some(model)) => write!(f, "{} {}", manufacturer, model),
            (Some(name), None) | (None, Some(name)) => f.write_str(name),
            (None, None) => f.write_str("Unknown"),
        }
    }
}
