//! HTTP report server
//!
//! Serves the latest migration report and lets operators trigger a refresh or submit the report
//! summary:
//!
//! - `GET /` returns the current report as JSON.
//! - `PUT /update` recomputes the report and returns it.
//! - `PUT /send` submits the report summary to the stats endpoint.
//!
//! Failures are returned as JSON `{"error": "..."}` bodies.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod server;

#[cfg(test)]
mod tests;

pub use self::server::{serve, ReportServer};
use ingress_analyzer_core::Report;
use std::sync::Arc;

/// Provides access to the analyzer's reports.
#[async_trait::async_trait]
pub trait Reports: Clone + Send + Sync + 'static {
    /// Returns the most recently published report.
    fn current(&self) -> Arc<Report>;

    /// Recomputes and publishes the report.
    async fn refresh(&self) -> anyhow::Result<Arc<Report>>;

    /// Submits the current report's summary.
    async fn send(&self) -> anyhow::Result<()>;
}
