//! Database layer for the settings store.
//!
//! ```no_run
//! use achroma_reader::database::Database;
//!
//! let db = Database::open("achroma.db").expect("failed to open database");
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
