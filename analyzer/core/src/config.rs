/// The controller identifier used by ingress-nginx in `IngressClass.spec.controller`.
pub const DEFAULT_CONTROLLER_CLASS: &str = "k8s.io/ingress-nginx";

/// The ingress class name ingress-nginx satisfies by default.
pub const DEFAULT_INGRESS_CLASS: &str = "nginx";

/// Describes which ingresses are analyzed and how reports are tagged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The `IngressClass` controller identifier to analyze. When empty,
    /// [`DEFAULT_CONTROLLER_CLASS`] is used.
    pub controller_class: String,

    /// The ingress class name this controller satisfies.
    ///
    /// Ingresses annotated with the legacy `kubernetes.io/ingress.class` annotation are analyzed
    /// only when the annotation holds this value. When `ingress_class_by_name` is set, the
    /// `IngressClass` with this name is selected regardless of its controller.
    pub ingress_class: String,

    pub ingress_class_by_name: bool,

    /// Also analyze ingresses that declare no class at all.
    pub watch_ingress_without_class: bool,

    /// Namespaces to analyze. Empty means all namespaces.
    pub namespaces: Vec<String>,

    /// Version tag stamped on every report.
    pub version: String,
}

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            controller_class: DEFAULT_CONTROLLER_CLASS.to_string(),
            ingress_class: DEFAULT_INGRESS_CLASS.to_string(),
            ingress_class_by_name: false,
            watch_ingress_without_class: false,
            namespaces: Vec::new(),
            version: "dev".to_string(),
        }
    }
}

impl Config {
    /// Returns the configured controller identifier, or the default when none is configured.
    pub fn controller_class(&self) -> &str {
        if self.controller_class.is_empty() {
            DEFAULT_CONTROLLER_CLASS
        } else {
            &self.controller_class
        }
    }

    /// Indicates whether ingresses in the given namespace are analyzed.
    pub fn watches_namespace(&self, namespace: &str) -> bool {
        self.namespaces.is_empty() || self.namespaces.iter().any(|ns| ns == namespace)
    }
}
