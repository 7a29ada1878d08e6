use crate::allow_list::{AllowList, NGINX_ANNOTATION_PREFIX};
use std::collections::BTreeMap;

/// Classifies ingress annotations against an [`AllowList`].
#[derive(Clone, Debug, Default)]
pub struct Classifier {
    allow_list: AllowList,
}

/// The result of classifying a single ingress's annotations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    /// ingress-nginx annotations missing from the allow-list, sorted by name.
    pub unsupported: Vec<String>,

    /// Set when the ingress carries any ingress-nginx annotation.
    pub has_nginx_annotation: bool,
}

/// The mutually exclusive compliance categories of an analyzed ingress.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// No ingress-nginx annotations.
    Vanilla,

    /// Only allow-listed ingress-nginx annotations.
    Supported,

    /// At least one ingress-nginx annotation that is not allow-listed.
    Unsupported,
}

// === impl Classifier ===

impl Classifier {
    pub fn new(allow_list: AllowList) -> Self {
        Self { allow_list }
    }

    /// Partitions the ingress-nginx annotations by whether the allow-list contains them.
    ///
    /// Annotation values are not inspected. Since the annotations are held in a sorted map, the
    /// unsupported names come out sorted.
    pub fn classify(&self, annotations: &BTreeMap<String, String>) -> Classification {
        let mut classification = Classification::default();
        for name in annotations.keys() {
            if !name.starts_with(NGINX_ANNOTATION_PREFIX) {
                continue;
            }

            classification.has_nginx_annotation = true;
            if !self.allow_list.contains(name) {
                classification.unsupported.push(name.clone());
            }
        }
        classification
    }
}

// === impl Classification ===

impl Classification {
    pub fn category(&self) -> Category {
        if !self.unsupported.is_empty() {
            Category::Unsupported
        } else if self.has_nginx_annotation {
            Category::Supported
        } else {
            Category::Vanilla
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.unsupported.is_empty()
    }
}
