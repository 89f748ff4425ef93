//! Core domain types

use std::fmt;

use agingctl_common::MAX_AGING_LEVEL;
use serde::Serialize;

use super::errors::ModuleError;

/// Battery aging level, always within `0..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct AgingLevel(u8);

impl AgingLevel {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(MAX_AGING_LEVEL);

    /// Parse a start-up or control argument.
    ///
    /// Only the first non-blank character is looked at. Absent, empty, or
    /// non-digit input yields level 0; a digit above 5 is rejected.
    ///
    /// # Errors
    /// Returns [`ModuleError::OutOfRange`] for the digits 6 to 9
    pub fn parse_arg(arg: Option<&str>) -> Result<Self, ModuleError> {
        let Some(first) = arg.and_then(|a| a.trim_start().chars().next()) else {
            return Ok(Self::MIN);
        };
        match first.to_digit(10) {
            // to_digit(10) is at most 9
            #[allow(clippy::cast_possible_truncation)]
            Some(d) => Self::try_from(d as u8),
            None => {
                log::warn!("Ignoring malformed aging level {first:?}, using 0");
                Ok(Self::MIN)
            }
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for AgingLevel {
    type Error = ModuleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > MAX_AGING_LEVEL {
            return Err(ModuleError::OutOfRange(value));
        }
        Ok(Self(value))
    }
}

impl fmt::Display for AgingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Module lifetime phases
///
/// `Uninitialized → Resolving → Armed → Captured → Shutdown`. Both `Armed`
/// and `Captured` accept control commands; before capture they operate on
/// a null device handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Uninitialized,
    Resolving,
    Armed,
    Captured,
    Shutdown,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Resolving => "resolving",
            Self::Armed => "armed",
            Self::Captured => "captured",
            Self::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absent_and_empty_default_to_zero() {
        assert_eq!(AgingLevel::parse_arg(None).unwrap(), AgingLevel::MIN);
        assert_eq!(AgingLevel::parse_arg(Some("")).unwrap(), AgingLevel::MIN);
        assert_eq!(AgingLevel::parse_arg(Some("   ")).unwrap(), AgingLevel::MIN);
    }

    #[test]
    fn test_parse_digits_in_range() {
        for d in 0..=5u8 {
            let arg = d.to_string();
            assert_eq!(AgingLevel::parse_arg(Some(arg.as_str())).unwrap().get(), d);
        }
    }

    #[test]
    fn test_parse_rejects_high_digits() {
        for d in 6..=9u8 {
            let arg = d.to_string();
            assert!(matches!(
                AgingLevel::parse_arg(Some(arg.as_str())),
                Err(ModuleError::OutOfRange(v)) if v == d
            ));
        }
    }

    #[test]
    fn test_parse_uses_first_character_only() {
        assert_eq!(AgingLevel::parse_arg(Some("3\n")).unwrap().get(), 3);
        assert_eq!(AgingLevel::parse_arg(Some("12")).unwrap().get(), 1);
        assert_eq!(AgingLevel::parse_arg(Some(" 4")).unwrap().get(), 4);
    }

    #[test]
    fn test_parse_malformed_defaults_to_zero() {
        assert_eq!(AgingLevel::parse_arg(Some("x")).unwrap(), AgingLevel::MIN);
        assert_eq!(AgingLevel::parse_arg(Some("-1")).unwrap(), AgingLevel::MIN);
    }

    #[test]
    fn test_try_from_bounds() {
        assert!(AgingLevel::try_from(5).is_ok());
        assert!(AgingLevel::try_from(6).is_err());
        assert!(AgingLevel::try_from(255).is_err());
    }
}
