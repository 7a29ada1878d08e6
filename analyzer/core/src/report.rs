use crate::{class, fingerprint, ingress, Category, Classifier, Config, Ingress, IngressClass};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Analysis details for a single ingress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressReport {
    pub name: String,
    pub namespace: String,

    /// The declared `spec.ingressClassName`, or empty.
    pub ingress_class_name: String,

    pub unsupported_annotations: Vec<String>,

    #[serde(skip)]
    pub has_nginx_annotation: bool,
}

/// The analysis of all in-scope ingresses.
///
/// Compatible ingresses are split into vanilla and supported ingresses, so that
/// `compatible + unsupported == total` and `compatible == vanilla + supported`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generation_date: DateTime<Utc>,
    pub version: String,

    /// SHA-256 of the report content, excluding the generation date.
    pub hash: String,

    pub ingress_count: usize,
    pub ingress_count_by_class: BTreeMap<String, usize>,

    pub compatible_ingress_count: usize,
    pub compatible_ingress_percentage: f64,

    pub vanilla_ingress_count: usize,
    pub vanilla_ingress_percentage: f64,

    pub supported_ingress_count: usize,
    pub supported_ingress_percentage: f64,

    pub unsupported_ingress_count: usize,
    pub unsupported_ingress_percentage: f64,

    /// Number of ingresses carrying each unsupported annotation.
    pub unsupported_ingress_annotations: BTreeMap<String, usize>,

    /// Ingresses with unsupported annotations, ordered by namespace and name.
    pub unsupported_ingresses: Vec<IngressReport>,
}

/// The reduced report submitted to the stats endpoint.
///
/// Per-ingress details and the report hash are never included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub version: String,
    pub ingress_count: usize,
    pub compatible_ingress_count: usize,
    pub vanilla_ingress_count: usize,
    pub supported_ingress_count: usize,
    pub unsupported_ingress_count: usize,
    pub unsupported_ingress_annotations: BTreeMap<String, usize>,
}

/// Folds ingresses into a [`Report`].
#[derive(Copy, Clone, Debug)]
pub struct Aggregator<'a> {
    config: &'a Config,
    classifier: &'a Classifier,
}

// === impl Report ===

impl Report {
    /// Returns the report published before any ingress has been analyzed.
    pub fn empty(version: impl Into<String>) -> Self {
        let mut report = Self::zero(version.into(), DateTime::<Utc>::default());
        report.hash = fingerprint::compute(&report);
        report
    }

    fn zero(version: String, generation_date: DateTime<Utc>) -> Self {
        Self {
            generation_date,
            version,
            hash: String::new(),
            ingress_count: 0,
            ingress_count_by_class: BTreeMap::new(),
            compatible_ingress_count: 0,
            compatible_ingress_percentage: 0.0,
            vanilla_ingress_count: 0,
            vanilla_ingress_percentage: 0.0,
            supported_ingress_count: 0,
            supported_ingress_percentage: 0.0,
            unsupported_ingress_count: 0,
            unsupported_ingress_percentage: 0.0,
            unsupported_ingress_annotations: BTreeMap::new(),
            unsupported_ingresses: Vec::new(),
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            version: self.version.clone(),
            ingress_count: self.ingress_count,
            compatible_ingress_count: self.compatible_ingress_count,
            vanilla_ingress_count: self.vanilla_ingress_count,
            supported_ingress_count: self.supported_ingress_count,
            unsupported_ingress_count: self.unsupported_ingress_count,
            unsupported_ingress_annotations: self.unsupported_ingress_annotations.clone(),
        }
    }

    fn count(&mut self, category: Category) {
        match category {
            Category::Vanilla => {
                self.compatible_ingress_count += 1;
                self.vanilla_ingress_count += 1;
            }
            Category::Supported => {
                self.compatible_ingress_count += 1;
                self.supported_ingress_count += 1;
            }
            Category::Unsupported => self.unsupported_ingress_count += 1,
        }
    }

    fn compute_percentages(&mut self) {
        let total = self.ingress_count;
        self.compatible_ingress_percentage = percentage(self.compatible_ingress_count, total);
        self.vanilla_ingress_percentage = percentage(self.vanilla_ingress_count, total);
        self.supported_ingress_percentage = percentage(self.supported_ingress_count, total);
        self.unsupported_ingress_percentage = percentage(self.unsupported_ingress_count, total);
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

// === impl Aggregator ===

impl<'a> Aggregator<'a> {
    pub fn new(config: &'a Config, classifier: &'a Classifier) -> Self {
        Self { config, classifier }
    }

    /// Builds a report over `ingresses`.
    ///
    /// The returned report has no hash; see [`Report::hash`].
    pub fn aggregate(
        &self,
        classes: &[IngressClass],
        ingresses: &[Ingress],
        generation_date: DateTime<Utc>,
    ) -> Report {
        let mut report = Report::zero(self.config.version.clone(), generation_date);

        let classes = class::resolve(classes, self.config);
        for ing in ingresses {
            let selection = ingress::select(ing, &classes, self.config);
            if !selection.in_scope {
                continue;
            }

            report.ingress_count += 1;
            *report
                .ingress_count_by_class
                .entry(selection.class_label)
                .or_default() += 1;

            let classification = self.classifier.classify(&ing.annotations);
            report.count(classification.category());
            if classification.is_compatible() {
                continue;
            }

            for annotation in &classification.unsupported {
                *report
                    .unsupported_ingress_annotations
                    .entry(annotation.clone())
                    .or_default() += 1;
            }
            report.unsupported_ingresses.push(IngressReport {
                name: ing.name.clone(),
                namespace: ing.namespace.clone(),
                ingress_class_name: ing.class_name.clone().unwrap_or_default(),
                unsupported_annotations: classification.unsupported,
                has_nginx_annotation: classification.has_nginx_annotation,
            });
        }

        report
            .unsupported_ingresses
            .sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        report.compute_percentages();
        report
    }
}
