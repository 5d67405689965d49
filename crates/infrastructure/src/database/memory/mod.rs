pub mod memory_employee_repository;
pub mod memory_miss_ledger;
pub mod memory_ride_repository;
pub mod memory_shift_repository;

pub use memory_employee_repository::InMemoryEmployeeRepository;
pub use memory_miss_ledger::InMemoryMissLedger;
pub use memory_ride_repository::InMemoryRideRepository;
pub use memory_shift_repository::InMemoryShiftRepository;
