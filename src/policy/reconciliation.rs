use std::sync::Arc;

use kube::runtime::controller::Action;

use crate::model::context::ContextData;
use crate::model::error::Error;
use crate::model::identity::ResourceIdentity;
use crate::model::spec::WebDeployment;
use crate::service::reconciler_svc::ReconcileOutcome;

/// The reconciler that will be called when either object change.
///
/// Only the identity of the delivered object is used, the reconciler reads the
/// parent again so stale or reordered events cannot roll the Deployment back.
pub async fn reconcile(web_deployment: Arc<WebDeployment>, context: Arc<ContextData>) -> Result<Action, Error> {
    let identity = match ResourceIdentity::of(web_deployment.as_ref()) {
        Ok(identity) => identity,
        Err(err) => {
            log::error!("Cannot reconcile WebDeployment without identity - {err}");
            return Ok(Action::await_change());
        }
    };

    let request = context.request_context();
    let outcome = context.reconciler.reconcile(&request, &identity).await?;
    context.backoff.reset(&identity);
    Ok(action_for(&outcome))
}

/// Every terminal outcome waits for the next change notification.
pub fn action_for(outcome: &ReconcileOutcome) -> Action {
    match outcome {
        ReconcileOutcome::Created
        | ReconcileOutcome::Updated
        | ReconcileOutcome::Unchanged
        | ReconcileOutcome::ParentDeleted
        | ReconcileOutcome::Abandoned(_) => Action::await_change(),
    }
}
