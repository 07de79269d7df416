use k8s_openapi::api::apps::v1::Deployment;
use kube::Resource;

use crate::model::spec::WebDeployment;

/// apiVersion + kind of a resource type, used when building owner references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub api_version: String,
    pub kind: String,
}

impl TypeDescriptor {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }

    pub fn of<K>() -> Self
        where K: Resource,
              K::DynamicType: Default,
    {
        let dt = K::DynamicType::default();
        Self::new(K::api_version(&dt), K::kind(&dt))
    }

    pub fn is_empty(&self) -> bool {
        self.api_version.is_empty() || self.kind.is_empty()
    }
}

/// The fixed pair of types handled by the reconciler, injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKinds {
    pub parent: TypeDescriptor,
    pub child: TypeDescriptor,
}

impl ResourceKinds {
    pub fn new(parent: TypeDescriptor, child: TypeDescriptor) -> Self {
        Self { parent, child }
    }
}

impl Default for ResourceKinds {
    fn default() -> Self {
        Self::new(TypeDescriptor::of::<WebDeployment>(), TypeDescriptor::of::<Deployment>())
    }
}
