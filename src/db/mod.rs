//! SQLite persistence for scan events.
//!
//! Every statement runs on a dedicated worker thread that owns the
//! connection; callers await results over a oneshot channel.

mod connection;
mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::StoredScan;
