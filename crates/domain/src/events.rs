//! 领域事件
//!
//! 每次状态转换成功后发布，供通知层（邮件等）订阅

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{RideRequest, RideStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RideEvent {
    pub id: Uuid,
    pub ride_id: Uuid,
    /// 提交时为 None
    pub from: Option<RideStatus>,
    pub to: RideStatus,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
    pub ride: RideRequest,
}

impl RideEvent {
    pub fn transition(
        from: Option<RideStatus>,
        ride: &RideRequest,
        actor: String,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ride_id: ride.id,
            from,
            to: ride.status,
            actor,
            occurred_at,
            ride: ride.clone(),
        }
    }

    pub fn event_type(&self) -> String {
        match self.from {
            None => "ride.submitted".to_string(),
            Some(_) => format!("ride.{}", self.to),
        }
    }
}
