use std::fmt;

/// Published role of a meter.
///
/// Only meters explicitly mapped to a role by configuration are published;
/// everything else classifies as `Unknown` and is dropped with a log line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum MeterRole {
    /// The household's main water meter
    Main,
    /// A secondary meter for garden irrigation
    Garden,
    /// Not mapped by configuration
    Unknown,
}

impl fmt::Display for MeterRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MeterRole::Main => write!(f, "main"),
            MeterRole::Garden => write!(f, "garden"),
            MeterRole::Unknown => write!(f, "unknown"),
        }
    }
}
