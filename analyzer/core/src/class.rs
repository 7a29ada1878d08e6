use crate::Config;

/// The parts of an `IngressClass` that matter for analysis.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IngressClass {
    pub name: String,

    /// The `spec.controller` identifier, e.g. `k8s.io/ingress-nginx`.
    pub controller: String,
}

// === impl IngressClass ===

impl IngressClass {
    pub fn new(name: impl Into<String>, controller: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            controller: controller.into(),
        }
    }
}

/// Selects the classes operated by the analyzed controller.
///
/// When `ingress_class_by_name` is set and a class named `ingress_class` exists, only that class
/// is returned. Otherwise all classes whose controller matches the configured controller class are
/// returned. An empty result means no managed class was found.
pub fn resolve<'c>(classes: &'c [IngressClass], config: &Config) -> Vec<&'c IngressClass> {
    if config.ingress_class_by_name {
        if let Some(class) = classes.iter().find(|c| c.name == config.ingress_class) {
            return vec![class];
        }
    }

    let controller = config.controller_class();
    classes
        .iter()
        .filter(|c| c.controller == controller)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_CONTROLLER_CLASS;

    fn classes() -> Vec<IngressClass> {
        vec![
            IngressClass::new("internal", DEFAULT_CONTROLLER_CLASS),
            IngressClass::new("nginx", DEFAULT_CONTROLLER_CLASS),
            IngressClass::new("public", "example.com/other"),
            IngressClass::new("traefik", "traefik.io/ingress-controller"),
        ]
    }

    fn names(classes: Vec<&IngressClass>) -> Vec<&str> {
        classes.into_iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn by_controller() {
        let classes = classes();
        let resolved = resolve(&classes, &Config::default());
        assert_eq!(names(resolved), vec!["internal", "nginx"]);
    }

    #[test]
    fn empty_controller_uses_default() {
        let classes = classes();
        let config = Config {
            controller_class: String::new(),
            ..Config::default()
        };
        assert_eq!(names(resolve(&classes, &config)), vec!["internal", "nginx"]);
    }

    #[test]
    fn custom_controller() {
        let classes = classes();
        let config = Config {
            controller_class: "example.com/other".to_string(),
            ..Config::default()
        };
        assert_eq!(names(resolve(&classes, &config)), vec!["public"]);
    }

    #[test]
    fn by_name_selects_a_single_class() {
        let classes = classes();
        let config = Config {
            ingress_class: "public".to_string(),
            ingress_class_by_name: true,
            ..Config::default()
        };
        assert_eq!(names(resolve(&classes, &config)), vec!["public"]);
    }

    #[test]
    fn by_name_falls_back_to_controller() {
        let classes = classes();
        let config = Config {
            ingress_class: "missing".to_string(),
            ingress_class_by_name: true,
            ..Config::default()
        };
        assert_eq!(names(resolve(&classes, &config)), vec!["internal", "nginx"]);
    }

    #[test]
    fn no_match() {
        let classes = vec![IngressClass::new("traefik", "traefik.io/ingress-controller")];
        assert!(resolve(&classes, &Config::default()).is_empty());
        assert!(resolve(&[], &Config::default()).is_empty());
    }
}
