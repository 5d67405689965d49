use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::{ConfigError, ConfigResult};

/// 服务时段配置
///
/// `start_time`/`end_time` 为服务区当地时间 `HH:MM`，两端均包含在内。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceHoursConfig {
    pub operating_days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
    /// 服务区相对UTC的偏移（分钟），仅用于换算带时区的预约时间
    pub utc_offset_minutes: i32,
}

impl Default for ServiceHoursConfig {
    fn default() -> Self {
        Self {
            operating_days: ["mon", "tue", "wed", "thu", "fri"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            start_time: "08:00".to_string(),
            end_time: "19:00".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

impl ServiceHoursConfig {
    pub fn weekdays(&self) -> ConfigResult<Vec<Weekday>> {
        let mut days = Vec::with_capacity(self.operating_days.len());
        for day in &self.operating_days {
            let weekday: Weekday = day.trim().parse().map_err(|_| {
                ConfigError::Validation(format!(
                    "service_hours.operating_days contains invalid weekday: '{day}'"
                ))
            })?;
            if !days.contains(&weekday) {
                days.push(weekday);
            }
        }
        Ok(days)
    }

    pub fn start_minute(&self) -> ConfigResult<u32> {
        ValidationUtils::parse_minute_of_day(&self.start_time, "service_hours.start_time")
    }

    pub fn end_minute(&self) -> ConfigResult<u32> {
        ValidationUtils::parse_minute_of_day(&self.end_time, "service_hours.end_time")
    }
}

impl ConfigValidator for ServiceHoursConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.operating_days.is_empty() {
            return Err(ConfigError::Validation(
                "service_hours.operating_days cannot be empty".to_string(),
            ));
        }
        self.weekdays()?;

        let start = self.start_minute()?;
        let end = self.end_minute()?;
        if start > end {
            return Err(ConfigError::Validation(format!(
                "service_hours.start_time ({}) must not be after end_time ({})",
                self.start_time, self.end_time
            )));
        }

        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(ConfigError::Validation(format!(
                "service_hours.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )));
        }

        Ok(())
    }
}

/// 爽约策略配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NoShowConfig {
    pub suspension_threshold: u32,
}

impl Default for NoShowConfig {
    fn default() -> Self {
        Self {
            suspension_threshold: 5,
        }
    }
}

impl ConfigValidator for NoShowConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_count(
            self.suspension_threshold,
            "no_show.suspension_threshold",
            100,
        )
    }
}
