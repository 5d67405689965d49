//! 行程生命周期与派车策略
//!
//! [`DispatchController`] 是所有行程变更的入口，审批时咨询
//! [`ServiceHoursPolicy`] 与 [`NoShowPolicy`]，认领交给 [`ClaimArbiter`]。

pub mod claim;
pub mod controller;
pub mod no_show;
pub mod seed;
pub mod service_hours;

pub use claim::ClaimArbiter;
pub use controller::{Clock, DispatchController, DispatchSummary};
pub use no_show::NoShowPolicy;
pub use seed::{default_roster, default_shifts};
pub use service_hours::{parse_requested_time, ServiceHoursPolicy};
