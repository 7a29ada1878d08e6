use crate::{Config, IngressClass};
use std::collections::BTreeMap;

/// The legacy annotation used to assign an ingress to a class before `spec.ingressClassName`.
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// The class label used to tally ingresses that declare no class.
pub const WITHOUT_CLASS: &str = "without-class";

/// The parts of an `Ingress` that matter for analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ingress {
    pub namespace: String,
    pub name: String,
    pub annotations: BTreeMap<String, String>,

    /// The `spec.ingressClassName`, if set.
    pub class_name: Option<String>,
}

/// Describes whether an ingress is analyzed and the class it is counted under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub in_scope: bool,
    pub class_label: String,
}

// === impl Ingress ===

impl Ingress {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_annotation(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(name.into(), value.into());
        self
    }
}

/// Decides whether `ingress` is operated by one of the resolved `classes`.
///
/// The first matching rule wins:
///
/// 1. an explicit `spec.ingressClassName` naming a resolved class;
/// 2. the legacy class annotation, which must hold the configured ingress class;
/// 3. no class at all, which is only analyzed when `watch_ingress_without_class` is set.
pub fn select(ingress: &Ingress, classes: &[&IngressClass], config: &Config) -> Selection {
    if let Some(name) = ingress.class_name.as_deref() {
        if let Some(class) = classes.iter().find(|c| c.name == name) {
            return Selection {
                in_scope: true,
                class_label: class.name.clone(),
            };
        }
    }

    if let Some(class) = ingress.annotations.get(INGRESS_CLASS_ANNOTATION) {
        return Selection {
            in_scope: *class == config.ingress_class,
            class_label: class.clone(),
        };
    }

    Selection {
        in_scope: config.watch_ingress_without_class,
        class_label: WITHOUT_CLASS.to_string(),
    }
}
