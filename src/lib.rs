//! `bugtrack`: an issue tracker with a filter query language and SLA tracking.
//!
//! - [`query`] parses filter strings and compiles them into parameterized
//!   predicates that a storage backend executes.
//! - [`sla`] computes resolution targets and aggregates risk and compliance.
//! - [`storage`] persists issues, comments, saved views and events in SQLite.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod model;
pub mod query;
pub mod sla;
pub mod storage;
pub mod util;
pub mod validation;

pub use error::{ErrorCode, Result, StructuredError, TrackerError, ValidationError};
