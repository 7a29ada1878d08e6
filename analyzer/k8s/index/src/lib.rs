//! Ingress index
//!
//! Maintains a local mirror of the cluster's `IngressClass` and `Ingress` resources from
//! `kubert::index` watch events:
//!
//! - `IngressClass`es are cluster-scoped and are all indexed.
//! - `Ingress`es are indexed per namespace, and only in the namespaces the analyzer is configured
//!   to watch. A scoped analyzer watches each namespace through its own [`NamespaceIndex`].
//!
//! The index implements [`ResourceSource`](ingress_analyzer_core::ResourceSource), so that a
//! report refresh can list the union of all watched namespaces. Listing fails until both resource
//! kinds have completed their initial list.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod index;
mod ingress;
mod ingress_class;


pub use self::index::{Index, NamespaceIndex, SharedIndex};
