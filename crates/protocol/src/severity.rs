//! Syslog-style severity levels

use crate::ProtocolError;

/// Entry severity, ordered from most to least urgent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    Emerg = 0,
    Alert = 1,
    Crit = 2,
    Err = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    #[default]
    Debug = 7,
}

impl Severity {
    /// Uppercase name, as rendered in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Emerg => "EMERG",
            Severity::Alert => "ALERT",
            Severity::Crit => "CRIT",
            Severity::Err => "ERR",
            Severity::Warning => "WARNING",
            Severity::Notice => "NOTICE",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Severity::Emerg,
            1 => Severity::Alert,
            2 => Severity::Crit,
            3 => Severity::Err,
            4 => Severity::Warning,
            5 => Severity::Notice,
            6 => Severity::Info,
            7 => Severity::Debug,
            other => return Err(ProtocolError::InvalidSeverity(other)),
        })
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for v in 0..=7u8 {
            let sev = Severity::try_from(v).unwrap();
            assert_eq!(sev as u8, v);
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            Severity::try_from(8),
            Err(ProtocolError::InvalidSeverity(8))
        );
    }

    #[test]
    fn test_ordering() {
        assert!(Severity::Emerg < Severity::Debug);
        assert!(Severity::Err < Severity::Warning);
    }
}
