use ingress_analyzer_core::Ingress;
use k8s_openapi::api::networking::v1 as networking;

pub(crate) fn from_resource(ingress: networking::Ingress) -> Ingress {
    let networking::Ingress { metadata, spec, .. } = ingress;
    Ingress {
        namespace: metadata.namespace.unwrap_or_default(),
        name: metadata.name.unwrap_or_default(),
        annotations: metadata.annotations.unwrap_or_default(),
        class_name: spec.and_then(|spec| spec.ingress_class_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use maplit::btreemap;

    #[test]
    fn converts_metadata_and_class() {
        let ingress = networking::Ingress {
            metadata: ObjectMeta {
                namespace: Some("ns-0".to_string()),
                name: Some("ing-0".to_string()),
                annotations: Some(btreemap! {
                    "nginx.ingress.kubernetes.io/ssl-redirect".to_string() => "true".to_string(),
                }),
                ..Default::default()
            },
            spec: Some(networking::IngressSpec {
                ingress_class_name: Some("nginx".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            from_resource(ingress),
            Ingress::new("ns-0", "ing-0")
                .with_class_name("nginx")
                .with_annotation("nginx.ingress.kubernetes.io/ssl-redirect", "true")
        );
    }

    #[test]
    fn missing_spec_and_annotations() {
        let ingress = networking::Ingress {
            metadata: ObjectMeta {
                namespace: Some("ns-0".to_string()),
                name: Some("ing-0".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(from_resource(ingress), Ingress::new("ns-0", "ing-0"));
    }
}
