//! 存储与事件发布的进程内实现

pub mod database;
pub mod event_publisher;

pub use database::memory::{
    InMemoryEmployeeRepository, InMemoryMissLedger, InMemoryRideRepository,
    InMemoryShiftRepository,
};
pub use event_publisher::BroadcastEventPublisher;
