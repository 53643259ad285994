//! Helpers shared by the unit tests and the integration tests.

pub mod testing;
