//! Database query modules.

pub mod records;
