//! Lookup of drivers by key

use crate::{
    devices::{ self, Driver, DriverCapabilities },
    error::Error,
};

/// Builds a driver from its configuration string
pub type DriverFactory = fn(&str) -> Result<Box<dyn Driver>, Error>;

/// A registered driver
#[derive(Clone)]
pub struct DriverEntry
{
    pub key: &'static str,
    pub capabilities: &'static DriverCapabilities,
    pub factory: DriverFactory,
}

impl DriverEntry
{
    pub fn create(&self, settings: &str) -> Result<Box<dyn Driver>, Error>
    {
        (self.factory)(settings)
    }
}

/// Maps driver keys to their capabilities and factories
///
/// Keys are matched case-insensitively. Registering a key twice replaces the earlier entry.
#[derive(Clone, Default)]
pub struct DriverRegistry
{
    entries: Vec<DriverEntry>,
}

macro_rules! builtin_entry
{
    ($key:literal, $module:ident) => {
        DriverEntry {
            key: $key,
            capabilities: &devices::$module::CAPABILITIES,
            factory: |settings| Ok(Box::new(devices::$module::Device::new(settings)?)),
        }
    };
}

impl DriverRegistry
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Every driver this crate ships with
    pub fn builtin() -> Self
    {
        let mut registry = Self::new();
        registry.register(builtin_entry!("agilent-u1231a", agilent_u1231a));
        registry.register(builtin_entry!("agilent-u1232a", agilent_u1232a));
        registry.register(builtin_entry!("agilent-u1233a", agilent_u1233a));
        registry.register(builtin_entry!("scpi-dmm", scpi_dmm));
        registry
    }

    pub fn register(&mut self, entry: DriverEntry)
    {
        self.entries.retain(|existing| !existing.key.eq_ignore_ascii_case(entry.key));
        self.entries.push(entry);
    }

    pub fn get(&self, key: &str) -> Option<&DriverEntry>
    {
        self.entries.iter().find(|entry| entry.key.eq_ignore_ascii_case(key))
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &DriverEntry>
    {
        self.entries.iter()
    }

    pub fn create(&self, key: &str, settings: &str) -> Result<Box<dyn Driver>, Error>
    {
        self.get(key)
            .ok_or_else(|| Error::UnknownDriver(key.to_string()))?
            .create(settings)
    }
}
