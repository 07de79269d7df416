use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

use crate::model::error::Error;
use crate::model::kinds::ResourceKinds;
use crate::model::spec::WebDeployment;

/// Controller reference from a managed Deployment back to its WebDeployment.
pub fn controller_owner_ref(kinds: &ResourceKinds, parent: &WebDeployment) -> Result<OwnerReference, Error> {
    if kinds.parent.is_empty() {
        return Err(Error::SchemeError(String::from("parent type is not registered")));
    }
    if kinds.parent == kinds.child {
        return Err(Error::SchemeError(format!("{} cannot own itself", kinds.parent.kind)));
    }
    let name = parent.metadata.name.clone()
        .ok_or(Error::MissingObjectKey(".metadata.name"))?;
    let uid = parent.metadata.uid.clone()
        .ok_or(Error::MissingObjectKey(".metadata.uid"))?;

    Ok(OwnerReference {
        api_version: kinds.parent.api_version.clone(),
        kind: kinds.parent.kind.clone(),
        name,
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Makes `parent` the single controlling owner of `child`.
///
/// References to the same uid are replaced, foreign non-controller references
/// are kept. A child controlled by a different owner is never taken over.
pub fn link(kinds: &ResourceKinds, parent: &WebDeployment, mut child: Deployment) -> Result<Deployment, Error> {
    let oref = controller_owner_ref(kinds, parent)?;

    let refs = child.metadata.owner_references.take().unwrap_or_default();
    let foreign_controller = refs.iter()
        .find(|existing| existing.controller == Some(true) && existing.uid != oref.uid);
    if let Some(other) = foreign_controller {
        log::warn!("Deployment {} is controlled by {} {}", child.metadata.name.as_deref().unwrap_or("-"), other.kind, other.name);
        return Err(Error::AlreadyOwned(child.metadata.name.clone().unwrap_or_default()));
    }

    let mut linked = false;
    let mut refs = refs.into_iter()
        .filter_map(|existing| {
            if existing.uid != oref.uid {
                Some(existing)
            } else if !linked {
                linked = true;
                Some(oref.clone())
            } else {
                None
            }
        })
        .collect::<Vec<_>>();
    if !linked {
        refs.push(oref);
    }

    child.metadata.owner_references = Some(refs);
    Ok(child)
}

/// True when `child` carries exactly one controller reference and it points at `parent`.
pub fn is_controlled_by(child: &Deployment, parent: &WebDeployment) -> bool {
    let controllers = child.metadata.owner_references.as_ref()
        .map(|refs| refs.iter().filter(|oref| oref.controller == Some(true)).collect::<Vec<_>>())
        .unwrap_or_default();
    match (controllers.as_slice(), parent.metadata.uid.as_ref()) {
        ([only], Some(uid)) => only.uid.eq(uid),
        _ => false,
    }
}
