//! Files written alongside the database.
//!
//! - [`json`]: per-collection JSON export of each run's accepted articles

pub mod json;
