pub mod app_config;
pub mod dispatch;
pub mod logging;
pub mod service_hours;

pub use app_config::*;
pub use dispatch::*;
pub use logging::*;
pub use service_hours::*;
