use crate::ConfigResult;

/// Trait for configuration validation
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// Validate that a count lies in `1..=max`
    pub fn validate_count(count: u32, field_name: &str, max: u32) -> ConfigResult<()> {
        if count == 0 {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > max {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    /// Parse an `HH:MM` wall-clock time into minutes after midnight.
    ///
    /// `24:00` is accepted as the end of the day.
    pub fn parse_minute_of_day(value: &str, field_name: &str) -> ConfigResult<u32> {
        let invalid = || {
            crate::ConfigError::Validation(format!(
                "{field_name} must be in HH:MM format, got '{value}'"
            ))
        };

        let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
        if hours.len() != 2 || minutes.len() != 2 {
            return Err(invalid());
        }
        let hours: u32 = hours.parse().map_err(|_| invalid())?;
        let minutes: u32 = minutes.parse().map_err(|_| invalid())?;

        match (hours, minutes) {
            (24, 0) => Ok(24 * 60),
            (h, m) if h < 24 && m < 60 => Ok(h * 60 + m),
            _ => Err(invalid()),
        }
    }
}
