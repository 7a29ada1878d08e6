use crate::{ingress, ingress_class};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use ingress_analyzer_core::{Config, Ingress, IngressClass, ListError, ResourceSource};
use k8s_openapi::api::networking::v1 as networking;
use kube::ResourceExt;
use kubert::index::{ClusterRemoved, IndexClusterResource, IndexNamespacedResource, NamespacedRemoved};
use parking_lot::RwLock;
use std::{collections::hash_map::Entry, sync::Arc};
use tokio::sync::watch;
use tracing::{debug, instrument, trace};

pub type SharedIndex = Arc<RwLock<Index>>;

/// Indexes the ingresses of a single namespace watch into a shared [`Index`].
///
/// When the analyzer is scoped to namespaces, each namespace is watched separately and ingresses
/// are synced once every namespace watch has reset.
#[derive(Debug)]
pub struct NamespaceIndex {
    namespace: String,
    index: SharedIndex,
}

/// Holds the ingress classes and in-scope ingresses currently known to the cluster.
#[derive(Debug)]
pub struct Index {
    config: Arc<Config>,

    /// Ingress classes by name.
    classes: HashMap<String, IngressClass>,

    /// Ingresses by namespace and name.
    namespaces: HashMap<String, HashMap<String, Ingress>>,

    classes_synced: bool,
    ingresses_synced: bool,

    /// Watched namespaces whose ingress watch has not yet completed its initial list.
    unsynced_namespaces: HashSet<String>,

    /// Set once both resource kinds have completed their initial list.
    synced: watch::Sender<bool>,
}

// === impl Index ===

impl Index {
    pub fn shared(config: impl Into<Arc<Config>>) -> SharedIndex {
        let config: Arc<Config> = config.into();
        let (synced, _) = watch::channel(false);
        let unsynced_namespaces = config.namespaces.iter().cloned().collect();
        Arc::new(RwLock::new(Self {
            config,
            classes: HashMap::default(),
            namespaces: HashMap::default(),
            classes_synced: false,
            ingresses_synced: false,
            unsynced_namespaces,
            synced,
        }))
    }

    /// Returns a receiver that becomes true once the index can be listed.
    pub fn synced_rx(&self) -> watch::Receiver<bool> {
        self.synced.subscribe()
    }

    pub fn is_synced(&self) -> bool {
        self.classes_synced && self.ingresses_synced
    }

    /// Returns the number of indexed ingresses.
    pub fn len(&self) -> usize {
        self.namespaces.values().map(|ingresses| ingresses.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    fn apply_class(&mut self, class: networking::IngressClass) {
        let class = ingress_class::from_resource(class);
        trace!(name = %class.name, controller = %class.controller, "Indexing IngressClass");
        self.classes.insert(class.name.clone(), class);
    }

    fn delete_class(&mut self, name: &str) {
        if self.classes.remove(name).is_some() {
            trace!(%name, "Removed IngressClass");
        }
    }

    #[instrument(
        skip(self, ingress),
        fields(
            ns = ?ingress.metadata.namespace,
            name = %ingress.name_any(),
        )
    )]
    fn apply_ingress(&mut self, ingress: networking::Ingress) {
        let ingress = ingress::from_resource(ingress);
        if !self.config.watches_namespace(&ingress.namespace) {
            trace!("Namespace is not watched");
            return;
        }

        self.namespaces
            .entry(ingress.namespace.clone())
            .or_default()
            .insert(ingress.name.clone(), ingress);
    }

    fn delete_ingress(&mut self, namespace: String, name: &str) {
        if let Entry::Occupied(mut entry) = self.namespaces.entry(namespace) {
            if entry.get_mut().remove(name).is_some() {
                trace!(ns = %entry.key(), %name, "Removed Ingress");
            }
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }

    fn reset_ingresses(&mut self, ingresses: Vec<networking::Ingress>, removed: NamespacedRemoved) {
        for (namespace, names) in removed {
            for name in names {
                self.delete_ingress(namespace.clone(), &name);
            }
        }
        for ingress in ingresses {
            self.apply_ingress(ingress);
        }
    }

    fn reset_namespace(
        &mut self,
        namespace: &str,
        ingresses: Vec<networking::Ingress>,
        removed: NamespacedRemoved,
    ) {
        self.reset_ingresses(ingresses, removed);
        if self.unsynced_namespaces.remove(namespace) {
            debug!(ns = %namespace, pending = self.unsynced_namespaces.len(), "Namespace synced");
        }
        if self.unsynced_namespaces.is_empty() {
            self.ingresses_synced = true;
        }
        self.mark_synced();
    }

    fn mark_synced(&mut self) {
        let synced = self.is_synced();
        self.synced.send_if_modified(|current| {
            if *current == synced {
                return false;
            }
            *current = synced;
            true
        });
        if synced {
            debug!(
                classes = self.classes.len(),
                ingresses = self.len(),
                "Index synced"
            );
        }
    }
}

impl IndexClusterResource<networking::IngressClass> for Index {
    fn apply(&mut self, class: networking::IngressClass) {
        self.apply_class(class);
    }

    fn delete(&mut self, name: String) {
        self.delete_class(&name);
    }

    fn reset(&mut self, classes: Vec<networking::IngressClass>, removed: ClusterRemoved) {
        for name in removed {
            self.delete_class(&name);
        }
        for class in classes {
            self.apply_class(class);
        }
        self.classes_synced = true;
        self.mark_synced();
    }
}

impl IndexNamespacedResource<networking::Ingress> for Index {
    fn apply(&mut self, ingress: networking::Ingress) {
        self.apply_ingress(ingress);
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_ingress(namespace, &name);
    }

    fn reset(&mut self, ingresses: Vec<networking::Ingress>, removed: NamespacedRemoved) {
        self.reset_ingresses(ingresses, removed);
        self.ingresses_synced = true;
        self.mark_synced();
    }
}

// === impl NamespaceIndex ===

impl NamespaceIndex {
    pub fn shared(index: SharedIndex, namespace: impl Into<String>) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self {
            namespace: namespace.into(),
            index,
        }))
    }
}

impl IndexNamespacedResource<networking::Ingress> for NamespaceIndex {
    fn apply(&mut self, ingress: networking::Ingress) {
        self.index.write().apply_ingress(ingress);
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.index.write().delete_ingress(namespace, &name);
    }

    fn reset(&mut self, ingresses: Vec<networking::Ingress>, removed: NamespacedRemoved) {
        self.index
            .write()
            .reset_namespace(&self.namespace, ingresses, removed);
    }
}

impl ResourceSource for Index {
    fn list_classes(&self) -> Result<Vec<IngressClass>, ListError> {
        if !self.classes_synced {
            return Err(ListError::NotSynced {
                kind: "IngressClass",
            });
        }

        let mut classes = self.classes.values().cloned().collect::<Vec<_>>();
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }

    fn list_ingresses(&self) -> Result<Vec<Ingress>, ListError> {
        if !self.ingresses_synced {
            return Err(ListError::NotSynced { kind: "Ingress" });
        }

        let mut ingresses = self
            .namespaces
            .values()
            .flat_map(|ingresses| ingresses.values())
            .cloned()
            .collect::<Vec<_>>();
        ingresses.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        Ok(ingresses)
    }
}
