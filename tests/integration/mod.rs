//! Integration tests for dbx-query.

pub mod config_test;
pub mod execute_test;
pub mod live_test;
