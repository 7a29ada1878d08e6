use crate::Report;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// The report fields covered by the fingerprint. Excludes the generation date and per-ingress
/// details.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Canonical<'r> {
    version: &'r str,
    ingress_count: usize,
    compatible_ingress_count: usize,
    vanilla_ingress_count: usize,
    supported_ingress_count: usize,
    unsupported_ingress_count: usize,
    unsupported_ingress_annotations: &'r BTreeMap<String, usize>,
}

/// Returns the hex-encoded SHA-256 of the report's canonical fields.
pub(crate) fn compute(report: &Report) -> String {
    let canonical = Canonical {
        version: &report.version,
        ingress_count: report.ingress_count,
        compatible_ingress_count: report.compatible_ingress_count,
        vanilla_ingress_count: report.vanilla_ingress_count,
        supported_ingress_count: report.supported_ingress_count,
        unsupported_ingress_count: report.unsupported_ingress_count,
        unsupported_ingress_annotations: &report.unsupported_ingress_annotations,
    };
    let json = serde_json::to_vec(&canonical).expect("fingerprint fields must serialize");
    hex::encode(Sha256::digest(&json))
}
