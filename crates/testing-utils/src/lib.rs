//! # Rideops Testing Utils
//!
//! Shared testing utilities for the rideops workspace: builders for
//! domain entities, recording test doubles and common fixtures.
//!
//! ```toml
//! [dev-dependencies]
//! rideops-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
