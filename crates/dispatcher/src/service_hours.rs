use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Timelike};
use rideops_config::{PolicyConfigHandle, ServiceWindow};
use tracing::debug;

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// 解析乘客填写的预约时间，返回服务区域的本地时间
///
/// 不带时区的时间按服务区域本地时间处理；RFC 3339 时间换算到配置的 UTC 偏移。
pub fn parse_requested_time(raw: &str, utc_offset_minutes: i32) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Some(local) = LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Some(local);
    }

    let offset = FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|instant| instant.with_timezone(&offset).naive_local())
}

/// 服务时段策略
#[derive(Debug, Clone)]
pub struct ServiceHoursPolicy {
    config: PolicyConfigHandle,
}

impl ServiceHoursPolicy {
    pub fn new(config: PolicyConfigHandle) -> Self {
        Self { config }
    }

    /// 无法解析的时间一律视为不在服务时段内
    pub fn is_eligible(&self, requested_time: &str) -> bool {
        let window = self.config.snapshot().window;
        match parse_requested_time(requested_time, window.utc_offset_minutes) {
            Some(local) => window_allows(&window, local),
            None => {
                debug!("无法解析预约时间: {:?}", requested_time);
                false
            }
        }
    }

    pub fn is_eligible_at(&self, local: NaiveDateTime) -> bool {
        window_allows(&self.config.snapshot().window, local)
    }
}

fn window_allows(window: &ServiceWindow, local: NaiveDateTime) -> bool {
    let minute_of_day = local.hour() * 60 + local.minute();
    window.contains(local.weekday(), minute_of_day)
}
