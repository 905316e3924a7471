//! In-memory connection for testing.
//!
//! Tables live in HashMaps wrapped in `Arc<RwLock<_>>` and vanish when the
//! last clone of the connection is dropped. Behaviour follows the database
//! closely enough for the operations layer to be tested without a server:
//! generated keys, timestamps, primary key conflicts, soft deletes and
//! primary key ordering.
//!
//! # Example
//!
//! ```rust,ignore
//! use roachops::connection::InMemoryConnection;
//!
//! let connection = InMemoryConnection::new("fluid_prefsdb");
//! ```

mod connection;

pub use connection::InMemoryConnection;
