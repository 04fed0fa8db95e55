//! Boundaries to the outside world: CSV streams and the JSON roster.

pub mod csv;
pub mod roster;
