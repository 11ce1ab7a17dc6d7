//! Small utility helpers: encodings, files and thin database wrappers.
//!
//! # Intention
//!
//! - Provide encoding conversions (Base64, Base64URL, Base91, JSON).
//! - Provide slash-separated path helpers and an append-only diagnostic log.
//! - Wrap SQLite and MySQL connections and scan result rows into [`Record`]s.
//!
//! # Architectural Boundaries
//!
//! - No pooling, migrations, retries or caching.
//! - No business logic; every helper is usable on its own.

pub mod conv;
pub mod database;
pub mod error;
pub mod file;
pub mod value;

pub use error::{Error, Result};
pub use value::{Record, Value};
