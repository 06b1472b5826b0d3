//! dbx-query - run SQL statements on Databricks SQL warehouses.
//!
//! Statements are submitted asynchronously, polled to completion under a
//! caller-supplied timeout and their results assembled from inline rows or
//! pre-signed chunk links. This library exposes the core modules for use in
//! integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod transport;
