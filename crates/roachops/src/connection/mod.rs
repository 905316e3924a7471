//! Connection implementations.
//!
//! This module provides concrete implementations of the `Connection` trait
//! defined in `roachops_core::operations`.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): rows held in process memory, for tests and
//!   database-less runs
//!
//! The CockroachDB connection is always available.

pub mod postgres;

#[cfg(feature = "inmemory")]
pub mod inmemory;

pub use postgres::CockroachConnection;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryConnection;
