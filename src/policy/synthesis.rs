use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use kube::api::ObjectMeta;
use kube::ResourceExt;

use crate::model::error::Error;
use crate::model::spec::WebDeployment;

pub static LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub static LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub static MANAGER_NAME: &str = "webapp-operator";
/// Fingerprint of the spec last written by the operator.
pub static ANNOTATION_APPLIED_SPEC: &str = "webapp-operator/applied-spec-hash";

/// Labels stamped on every managed Deployment.
pub fn derived_labels(parent_name: &str) -> BTreeMap<String, String> {
    [
        (String::from(LABEL_MANAGED_BY), String::from(MANAGER_NAME)),
        (String::from(LABEL_INSTANCE), String::from(parent_name)),
    ].into_iter().collect()
}

/// md5 of the JSON form of a Deployment spec.
pub fn spec_fingerprint(spec: &DeploymentSpec) -> Result<String, Error> {
    let serialized = serde_json::to_vec(spec)
        .map_err(|err| Error::InvalidSpec(format!("cannot serialize deployment spec - {err}")))?;
    Ok(format!("{:x}", md5::compute(serialized)))
}

/// Fingerprint recorded on a Deployment, if any.
pub fn applied_fingerprint(child: &Deployment) -> Option<&str> {
    child.metadata.annotations.as_ref()
        .and_then(|annotations| annotations.get(ANNOTATION_APPLIED_SPEC))
        .map(String::as_str)
}

/// Builds the desired Deployment for a WebDeployment.
///
/// The Deployment takes the parent's namespace and name, and its spec is an owned
/// copy of `spec.deployment`. Server assigned fields (`resourceVersion`, `uid`)
/// are left unset. The spec fingerprint is recorded under [`ANNOTATION_APPLIED_SPEC`].
pub fn synthesize(parent: &WebDeployment) -> Result<Deployment, Error> {
    let namespace = parent.namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    let name = parent.metadata.name.clone()
        .filter(|name| !name.is_empty())
        .ok_or(Error::MissingObjectKey(".metadata.name"))?;

    let spec = parent.spec.deployment.clone();
    validate(&spec)?;
    let fingerprint = spec_fingerprint(&spec)?;

    Ok(Deployment {
        metadata: ObjectMeta {
            annotations: Some([(String::from(ANNOTATION_APPLIED_SPEC), fingerprint)].into_iter().collect()),
            labels: Some(derived_labels(&name)),
            name: Some(name),
            namespace: Some(namespace),
            ..ObjectMeta::default()
        },
        spec: Some(spec),
        status: None,
    })
}

fn validate(spec: &DeploymentSpec) -> Result<(), Error> {
    if let Some(replicas) = spec.replicas {
        if replicas < 0 {
            return Err(Error::InvalidSpec(format!("replicas must not be negative, got {replicas}")));
        }
    }

    let match_labels = spec.selector.match_labels.clone().unwrap_or_default();
    let has_expressions = spec.selector.match_expressions.as_ref()
        .map(|expressions| !expressions.is_empty())
        .unwrap_or(false);
    if match_labels.is_empty() && !has_expressions {
        return Err(Error::InvalidSpec(String::from("selector must not be empty")));
    }

    let template_labels = spec.template.metadata.as_ref()
        .and_then(|meta| meta.labels.clone())
        .unwrap_or_default();
    for (key, value) in &match_labels {
        if template_labels.get(key) != Some(value) {
            return Err(Error::InvalidSpec(format!("selector {key}={value} does not match the pod template labels")));
        }
    }

    let containers_count = spec.template.spec.as_ref()
        .map(|pod| pod.containers.len())
        .unwrap_or(0);
    if containers_count == 0 {
        return Err(Error::InvalidSpec(String::from("pod template must declare at least one container")));
    }

    Ok(())
}
