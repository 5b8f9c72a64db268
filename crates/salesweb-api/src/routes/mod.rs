//! Route modules for the API server
//!
//! - reports: period reports, CSV download, sales format
//!
//! Each module keeps its handlers in api.rs and re-exports them from mod.rs.

pub mod reports;
