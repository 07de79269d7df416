use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;

use crate::model::context::RequestContext;
use crate::model::error::Error;
use crate::model::identity::ResourceIdentity;
use crate::model::kinds::ResourceKinds;
use crate::model::spec::{WebDeployment, WebDeploymentPhase, WebDeploymentStatus};
use crate::policy::drift::{labels_drifted, spec_drifted};
use crate::policy::ownership::link;
use crate::policy::synthesis::{applied_fingerprint, synthesize};
use crate::service::cluster_svc::{ResourceClient, StatusWriter};

/// Terminal state reached by a reconciliation pass that needs no retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    Unchanged,
    /// Parent is gone, the Deployment is left to the garbage collector.
    ParentDeleted,
    /// A permanent error, only an edit of the parent (or a redeploy) can unblock it.
    Abandoned(String),
}

pub struct ReconcilerService<P, C> {
    parents: P,
    children: C,
    kinds: ResourceKinds,
}

impl<P, C> ReconcilerService<P, C>
    where P: ResourceClient<WebDeployment> + StatusWriter,
          C: ResourceClient<Deployment>,
{
    pub fn new(parents: P, children: C, kinds: ResourceKinds) -> Self {
        Self {
            parents,
            children,
            kinds,
        }
    }

    /// Drives the Deployment of `identity` toward the state described by its WebDeployment.
    ///
    /// Returns `Err` only for retryable failures, permanent ones are logged and
    /// reported as [`ReconcileOutcome::Abandoned`].
    pub async fn reconcile(&self, ctx: &RequestContext, identity: &ResourceIdentity) -> Result<ReconcileOutcome, Error> {
        match self.converge(ctx, identity).await {
            Ok(outcome) => {
                log::debug!("WebDeployment {identity} reconciled: {outcome:?}");
                Ok(outcome)
            }
            Err(err) if err.is_retryable() => Err(err),
            Err(err) => {
                log::error!("Giving up on WebDeployment {identity} until it changes - {err}");
                Ok(ReconcileOutcome::Abandoned(err.to_string()))
            }
        }
    }

    async fn converge(&self, ctx: &RequestContext, identity: &ResourceIdentity) -> Result<ReconcileOutcome, Error> {
        let Some(parent) = ctx.bound(self.parents.get(identity)).await? else {
            log::info!("WebDeployment {identity} not found, nothing to reconcile");
            return Ok(ReconcileOutcome::ParentDeleted);
        };

        let desired = match synthesize(&parent) {
            Ok(desired) => desired,
            Err(err) => {
                if let Error::InvalidSpec(reason) = &err {
                    self.report_status(ctx, identity, &parent, invalid_status(&parent, reason)).await;
                }
                return Err(err);
            }
        };
        let desired = link(&self.kinds, &parent, desired)?;

        let (outcome, child) = match ctx.bound(self.children.get(identity)).await? {
            None => {
                log::info!("Creating Deployment {identity}");
                let created = ctx.bound(self.children.create(&desired)).await?;
                (ReconcileOutcome::Created, created)
            }
            Some(existing) => match self.converged_child(&parent, &existing, &desired)? {
                None => (ReconcileOutcome::Unchanged, existing),
                Some(candidate) => {
                    log::info!("Updating drifted Deployment {identity}");
                    let updated = ctx.bound(self.children.update(&candidate)).await?;
                    (ReconcileOutcome::Updated, updated)
                }
            },
        };

        self.report_status(ctx, identity, &parent, synced_status(&parent, &child)).await;
        Ok(outcome)
    }

    /// Existing Deployment with the derived fields applied, `None` when nothing drifted.
    ///
    /// The spec is replaced when the parent spec changed since it was last applied
    /// (fingerprint mismatch) or when another writer edited a field the parent sets.
    /// The candidate keeps the existing resourceVersion, status, foreign annotations
    /// and foreign labels.
    fn converged_child(&self, parent: &WebDeployment, existing: &Deployment, desired: &Deployment) -> Result<Option<Deployment>, Error> {
        let mut candidate = existing.clone();

        if let Some(desired_spec) = desired.spec.as_ref() {
            let reapply = applied_fingerprint(existing) != applied_fingerprint(desired);
            if reapply || spec_drifted(existing.spec.as_ref(), desired_spec)? {
                candidate.spec = Some(desired_spec.clone());
                candidate.metadata.annotations
                    .get_or_insert_with(BTreeMap::new)
                    .extend(desired.metadata.annotations.clone().unwrap_or_default());
            }
        }

        let desired_labels = desired.metadata.labels.clone().unwrap_or_default();
        if labels_drifted(existing.metadata.labels.as_ref(), &desired_labels) {
            candidate.metadata.labels
                .get_or_insert_with(BTreeMap::new)
                .extend(desired_labels);
        }

        let candidate = link(&self.kinds, parent, candidate)?;
        Ok((candidate != *existing).then_some(candidate))
    }

    async fn report_status(&self, ctx: &RequestContext, identity: &ResourceIdentity, parent: &WebDeployment, status: WebDeploymentStatus) {
        if parent.status.as_ref() == Some(&status) {
            return;
        }
        if let Err(err) = ctx.bound(self.parents.update_status(identity, &status)).await {
            log::warn!("Cannot update status of WebDeployment {identity} - {err}");
        }
    }
}

fn synced_status(parent: &WebDeployment, child: &Deployment) -> WebDeploymentStatus {
    let child_status = child.status.as_ref();
    WebDeploymentStatus {
        observed_generation: parent.metadata.generation,
        deployment_name: child.metadata.name.clone(),
        replicas: child_status.and_then(|status| status.replicas),
        ready_replicas: child_status.and_then(|status| status.ready_replicas),
        phase: WebDeploymentPhase::Synced,
        message: None,
    }
}

fn invalid_status(parent: &WebDeployment, reason: &str) -> WebDeploymentStatus {
    let previous = parent.status.clone().unwrap_or_default();
    WebDeploymentStatus {
        observed_generation: parent.metadata.generation,
        phase: WebDeploymentPhase::Invalid,
        message: Some(reason.to_owned()),
        ..previous
    }
}
