pub mod memory;

pub use memory::{
    InMemoryEmployeeRepository, InMemoryMissLedger, InMemoryRideRepository,
    InMemoryShiftRepository,
};
