//! Event routing from watched objects to reconcile requests.
//!
//! Every event on an Orderer, or on a child object whose controller owner is
//! an Orderer, becomes a request keyed by that Orderer's namespace and name.
//! Requests carry no other state: the reconciler reads current state itself.

use std::fmt;

use kube::Resource;
use kube::runtime::reflector::ObjectRef;

use crate::crd::{ORDERER_GROUP, ORDERER_KIND, Orderer};

/// Key of an Orderer to reconcile.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReconcileRequest {
    pub namespace: String,
    pub name: String,
}

impl ReconcileRequest {
    /// Create a request for the given namespace and name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Request for an Orderer object, if it has a name.
    ///
    /// Objects without a namespace are placed in `default`.
    pub fn for_orderer(orderer: &Orderer) -> Option<Self> {
        Self::for_object(orderer)
    }

    fn for_object<K: Resource>(obj: &K) -> Option<Self> {
        let meta = obj.meta();
        let name = meta.name.clone()?;
        let namespace = meta
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string());
        Some(Self { namespace, name })
    }

    /// Reference understood by the kube-runtime scheduler.
    pub fn object_ref(&self) -> ObjectRef<Orderer> {
        ObjectRef::new(&self.name).within(&self.namespace)
    }
}

impl From<ObjectRef<Orderer>> for ReconcileRequest {
    fn from(obj: ObjectRef<Orderer>) -> Self {
        Self {
            namespace: obj.namespace.unwrap_or_else(|| "default".to_string()),
            name: obj.name,
        }
    }
}

impl fmt::Display for ReconcileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Lifecycle event observed on a watched object.
#[derive(Clone, Debug)]
pub enum ResourceEvent<K> {
    /// Object was created or updated.
    Applied(K),
    /// Object was deleted.
    Deleted(K),
}

impl<K> ResourceEvent<K> {
    /// The object the event is about.
    pub fn object(&self) -> &K {
        match self {
            ResourceEvent::Applied(obj) | ResourceEvent::Deleted(obj) => obj,
        }
    }
}

/// Routes primary and owned-child events to Orderer reconcile requests.
#[derive(Clone, Debug)]
pub struct EventRouter {
    owner_group: String,
    owner_kind: String,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::for_orderers()
    }
}

impl EventRouter {
    /// Router for children controlled by Orderers.
    pub fn for_orderers() -> Self {
        Self {
            owner_group: ORDERER_GROUP.to_string(),
            owner_kind: ORDERER_KIND.to_string(),
        }
    }

    /// Request for a primary object event.
    pub fn route_primary(&self, orderer: &Orderer) -> Option<ReconcileRequest> {
        ReconcileRequest::for_orderer(orderer)
    }

    /// Request for the Orderer controlling a child object, if any.
    ///
    /// Only the controller owner reference counts; plain owner references
    /// and owners of other kinds are ignored.
    pub fn route_owned<K: Resource>(&self, child: &K) -> Option<ReconcileRequest> {
        let meta = child.meta();
        let namespace = meta.namespace.clone()?;
        meta.owner_references
            .as_ref()?
            .iter()
            .find(|owner| owner.controller == Some(true))
            .filter(|owner| {
                owner.kind == self.owner_kind && api_group(&owner.api_version) == self.owner_group
            })
            .map(|owner| ReconcileRequest::new(namespace, owner.name.clone()))
    }

    /// Request for an applied or deleted object of any watched kind.
    ///
    /// An Orderer routes to its own key; any other object routes to the
    /// Orderer that controls it.
    pub fn route<K>(&self, event: &ResourceEvent<K>) -> Option<ReconcileRequest>
    where
        K: Resource<DynamicType = ()>,
    {
        let obj = event.object();
        if K::group(&()) == self.owner_group && K::kind(&()) == self.owner_kind {
            ReconcileRequest::for_object(obj)
        } else {
            self.route_owned(obj)
        }
    }
}

/// Group part of an `apiVersion` (`group/version`, or empty for the core group).
fn api_group(api_version: &str) -> &str {
    api_version
        .rsplit_once('/')
        .map(|(group, _)| group)
        .unwrap_or("")
}
