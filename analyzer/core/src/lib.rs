//! Ingress NGINX migration analysis
//!
//! The analyzer determines how many of a cluster's `Ingress` resources could be served by another
//! ingress controller without changes. Each in-scope ingress falls into exactly one category:
//!
//! - *vanilla*: no ingress-nginx annotations at all;
//! - *supported*: only ingress-nginx annotations that appear in the [`AllowList`];
//! - *unsupported*: at least one ingress-nginx annotation missing from the allow-list.
//!
//! Vanilla and supported ingresses are together *compatible*.
//!
//! ```text
//! [ IngressClass ] -> class::resolve -> ingress::select -> Classifier -> Aggregator -> Report
//! ```
//!
//! The [`ReportStore`] holds the most recent [`Report`]. It is refreshed from a
//! [`ResourceSource`], which is implemented by the Kubernetes index, and read concurrently by the
//! HTTP server, the metrics and the stats client.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod allow_list;
pub mod class;
pub mod classify;
mod config;
mod fingerprint;
pub mod ingress;
pub mod report;
pub mod store;


pub use self::{
    allow_list::AllowList,
    class::IngressClass,
    classify::{Category, Classification, Classifier},
    config::{Config, DEFAULT_CONTROLLER_CLASS, DEFAULT_INGRESS_CLASS},
    ingress::{Ingress, Selection},
    report::{Aggregator, IngressReport, Report, ReportSummary},
    store::{ListError, RefreshError, ReportStore, ResourceSource},
};
