//! Domain types and the compensation rule.
//!
//! Everything here is storage-agnostic; persistence and time are reached only
//! through the ports in [`ports`].

pub mod attendance;
pub mod offering;
pub mod ports;
pub mod pricing;
pub mod salary;
pub mod trainer;
