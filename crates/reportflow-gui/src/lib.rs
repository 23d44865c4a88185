//! Web surface for the ReportFlow crew: an embedded form page, a small JSON
//! API to start analyses, and SSE streams for status updates.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
