#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use ingress_analyzer_core as core;
pub use ingress_analyzer_http as http;
pub use ingress_analyzer_k8s_index as index;

mod args;
mod metrics;
pub mod stats;

pub use self::args::Args;

use self::metrics::Metrics;
use std::sync::Arc;
use tracing::{info, warn};

/// Serves and refreshes reports over the discovery index.
#[derive(Clone, Debug)]
struct Analyzer {
    store: Arc<core::ReportStore>,
    index: index::SharedIndex,
    stats: Arc<stats::Client>,
    metrics: Metrics,
}

// === impl Analyzer ===

impl Analyzer {
    fn refresh_report(&self) -> Result<Arc<core::Report>, core::RefreshError> {
        let res = self.store.refresh(&self.index);
        self.metrics.record_refresh(&res);
        if let Ok(report) = &res {
            info!(
                ingresses = report.ingress_count,
                compatible = report.compatible_ingress_count,
                unsupported = report.unsupported_ingress_count,
                "Report refreshed"
            );
        }
        res
    }

    /// Refreshes the report, logging rather than returning failures.
    fn try_refresh(&self) {
        if let Err(error) = self.refresh_report() {
            warn!(%error, "Failed to refresh report; keeping the previous report");
        }
    }
}

#[async_trait::async_trait]
impl http::Reports for Analyzer {
    fn current(&self) -> Arc<core::Report> {
        self.store.current()
    }

    async fn refresh(&self) -> anyhow::Result<Arc<core::Report>> {
        Ok(self.refresh_report()?)
    }

    async fn send(&self) -> anyhow::Result<()> {
        let summary = self.store.current().summary();
        let res = self.stats.send(&summary).await;
        self.metrics.record_send(&res);
        Ok(res?)
    }
}
