use ingress_analyzer_core::IngressClass;
use k8s_openapi::api::networking::v1 as networking;

pub(crate) fn from_resource(class: networking::IngressClass) -> IngressClass {
    let networking::IngressClass { metadata, spec, .. } = class;
    IngressClass {
        name: metadata.name.unwrap_or_default(),
        controller: spec.and_then(|spec| spec.controller).unwrap_or_default(),
    }
}
