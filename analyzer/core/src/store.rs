use crate::{fingerprint, Aggregator, Classifier, Config, Ingress, IngressClass, Report};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

/// Lists the resources currently known to the cluster.
///
/// Implementations merge every watched namespace into a single listing.
pub trait ResourceSource {
    fn list_classes(&self) -> Result<Vec<IngressClass>, ListError>;

    fn list_ingresses(&self) -> Result<Vec<Ingress>, ListError>;
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("{kind} cache has not synced")]
    NotSynced { kind: &'static str },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("listing IngressClasses: {0}")]
    Classes(ListError),

    #[error("listing Ingresses: {0}")]
    Ingresses(ListError),
}

/// Holds the most recently computed [`Report`].
///
/// Readers always observe a complete report. A refresh computes the next report without holding
/// the lock and only swaps it in once it is complete; a failed refresh leaves the previous report
/// in place.
#[derive(Debug)]
pub struct ReportStore {
    config: Arc<Config>,
    classifier: Classifier,
    report: RwLock<Arc<Report>>,
}

// === impl ReportStore ===

impl ReportStore {
    pub fn new(config: impl Into<Arc<Config>>) -> Self {
        Self::with_classifier(config, Classifier::default())
    }

    pub fn with_classifier(config: impl Into<Arc<Config>>, classifier: Classifier) -> Self {
        let config = config.into();
        let report = RwLock::new(Arc::new(Report::empty(config.version.clone())));
        Self {
            config,
            classifier,
            report,
        }
    }

    pub fn shared(config: impl Into<Arc<Config>>) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    /// Returns the latest report.
    pub fn current(&self) -> Arc<Report> {
        self.report.read().clone()
    }

    /// Lists the source's classes and ingresses and publishes a new report.
    ///
    /// Listing failures are returned without modifying the store.
    pub fn refresh<S>(&self, source: &S) -> Result<Arc<Report>, RefreshError>
    where
        S: ResourceSource + ?Sized,
    {
        let classes = source.list_classes().map_err(RefreshError::Classes)?;
        let ingresses = source.list_ingresses().map_err(RefreshError::Ingresses)?;
        Ok(self.publish(&classes, &ingresses))
    }

    /// Computes a report over already-listed resources and publishes it.
    pub fn publish(&self, classes: &[IngressClass], ingresses: &[Ingress]) -> Arc<Report> {
        let report = Arc::new(self.compute(classes, ingresses, Utc::now()));
        tracing::debug!(
            ingresses = report.ingress_count,
            unsupported = report.unsupported_ingress_count,
            hash = %report.hash,
            "Publishing report"
        );
        *self.report.write() = report.clone();
        report
    }

    pub(crate) fn compute(
        &self,
        classes: &[IngressClass],
        ingresses: &[Ingress],
        generation_date: DateTime<Utc>,
    ) -> Report {
        let mut report = Aggregator::new(&self.config, &self.classifier).aggregate(
            classes,
            ingresses,
            generation_date,
        );
        report.hash = fingerprint::compute(&report);
        report
    }
}

impl<T: ResourceSource> ResourceSource for Arc<RwLock<T>> {
    fn list_classes(&self) -> Result<Vec<IngressClass>, ListError> {
        self.read().list_classes()
    }

    fn list_ingresses(&self) -> Result<Vec<Ingress>, ListError> {
        self.read().list_ingresses()
    }
}
