//! Device command definition and serialization

use std::fmt;

/// Queries understood by every supported multimeter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdSet
{
    /// Ask the device who it is
    ///
    /// Command: `*IDN?`
    Identify,
    /// Take a reading on the currently selected range
    ///
    /// Command: `READ?`
    Read,
    /// Ask which function and range are currently selected
    ///
    /// Command: `CONF?`
    Configuration,
}

impl fmt::Display for CmdSet
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            CmdSet::Identify => write!(f, "*IDN?"),
            CmdSet::Read => write!(f, "READ?"),
            CmdSet::Configuration => write!(f, "CONF?"),
        }
    }
}
