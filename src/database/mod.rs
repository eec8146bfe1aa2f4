//! Tabshell database layer.
//!
//! SQLite storage for the bookmark tree.
//!
//! ```no_run
//! use tabshell::database::Database;
//!
//! let db = Database::open("bookmarks.db").expect("failed to open database");
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
