//! ic-db: database access and persistence layer.
//!
//! This crate provides SQLite-backed record storage with connection pooling,
//! embedded migrations, a typed row model, and the record query module used
//! by the lifecycle pipeline.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
