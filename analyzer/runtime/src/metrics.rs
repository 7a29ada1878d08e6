use ingress_analyzer_core::{RefreshError, Report};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};
use parking_lot::Mutex;
use std::{collections::BTreeSet, sync::Arc};

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    ingresses: Family<CategoryLabels, Gauge>,
    unsupported_annotations: Family<AnnotationLabels, Gauge>,
    reported_annotations: Arc<Mutex<BTreeSet<String>>>,
    refreshes: Family<ResultLabels, Counter>,
    sends: Family<ResultLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct CategoryLabels {
    category: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct AnnotationLabels {
    annotation: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ResultLabels {
    result: String,
}

// === impl Metrics ===

impl Metrics {
    pub(crate) fn register(prom: &mut Registry) -> Self {
        let ingresses = Family::default();
        prom.register(
            "ingresses",
            "Number of analyzed ingresses in the latest report, by category",
            ingresses.clone(),
        );

        let unsupported_annotations = Family::default();
        prom.register(
            "unsupported_annotations",
            "Number of ingresses in the latest report carrying each unsupported annotation",
            unsupported_annotations.clone(),
        );

        let refreshes = Family::default();
        prom.register(
            "refreshes",
            "Count of report refreshes by result",
            refreshes.clone(),
        );

        let sends = Family::default();
        prom.register(
            "sends",
            "Count of report summaries sent to the stats endpoint by result",
            sends.clone(),
        );

        Self {
            ingresses,
            unsupported_annotations,
            reported_annotations: Default::default(),
            refreshes,
            sends,
        }
    }

    pub(crate) fn record_refresh(&self, result: &Result<Arc<Report>, RefreshError>) {
        self.refreshes
            .get_or_create(&ResultLabels::new(result.is_ok()))
            .inc();
        if let Ok(report) = result {
            self.record_report(report);
        }
    }

    pub(crate) fn record_send<E>(&self, result: &Result<(), E>) {
        self.sends
            .get_or_create(&ResultLabels::new(result.is_ok()))
            .inc();
    }

    fn record_report(&self, report: &Report) {
        for (category, count) in [
            ("total", report.ingress_count),
            ("compatible", report.compatible_ingress_count),
            ("vanilla", report.vanilla_ingress_count),
            ("supported", report.supported_ingress_count),
            ("unsupported", report.unsupported_ingress_count),
        ] {
            self.ingresses
                .get_or_create(&CategoryLabels {
                    category: category.to_string(),
                })
                .set(count as i64);
        }

        let annotations = &report.unsupported_ingress_annotations;
        let mut reported = self.reported_annotations.lock();
        for (annotation, count) in annotations {
            self.unsupported_annotations
                .get_or_create(&AnnotationLabels {
                    annotation: annotation.clone(),
                })
                .set(*count as i64);
        }

        // Annotations that are no longer reported must not keep their last value.
        reported.retain(|annotation| {
            if annotations.contains_key(annotation) {
                return true;
            }
            self.unsupported_annotations.remove(&AnnotationLabels {
                annotation: annotation.clone(),
            });
            false
        });
        reported.extend(annotations.keys().cloned());
    }
}

impl ResultLabels {
    fn new(ok: bool) -> Self {
        Self {
            result: if ok { "success" } else { "failure" }.to_string(),
        }
    }
}
