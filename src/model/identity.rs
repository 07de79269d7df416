use std::fmt;

use kube::{Resource, ResourceExt};

use crate::model::error::Error;

/// Namespace + name pair keying a reconcile request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentity {
    pub namespace: String,
    pub name: String,
}

impl ResourceIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self, Error> {
        let namespace = namespace.into();
        let name = name.into();
        if namespace.is_empty() {
            return Err(Error::MissingObjectKey(".metadata.namespace"));
        }
        if name.is_empty() {
            return Err(Error::MissingObjectKey(".metadata.name"));
        }
        Ok(Self { namespace, name })
    }

    pub fn of<K: Resource>(obj: &K) -> Result<Self, Error> {
        let namespace = obj.namespace()
            .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
        Self::new(namespace, obj.name_any())
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
