use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use kube::runtime::controller::Action;
use tokio_util::sync::CancellationToken;

use crate::model::context::ContextData;
use crate::model::error::Error;
use crate::model::identity::ResourceIdentity;
use crate::model::spec::WebDeployment;

/// Per identity exponential backoff, `base * 2^(attempt - 1)` capped at `max`.
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempts: DashMap<ResourceIdentity, u32>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempts: DashMap::new(),
        }
    }

    /// Records a failed pass and returns the delay before the next one.
    pub fn next_delay(&self, identity: &ResourceIdentity) -> Duration {
        let mut attempt = self.attempts.entry(identity.clone()).or_insert(0);
        *attempt = attempt.saturating_add(1);
        let exponent = (*attempt - 1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }

    pub fn reset(&self, identity: &ResourceIdentity) {
        self.attempts.remove(identity);
    }

    /// Drops the counters of identities the controller no longer knows, returns how many.
    pub fn retain(&self, known: impl Fn(&ResourceIdentity) -> bool) -> usize {
        let before = self.attempts.len();
        self.attempts.retain(|identity, _| known(identity));
        before - self.attempts.len()
    }

    pub fn attempts(&self, identity: &ResourceIdentity) -> u32 {
        self.attempts.get(identity).map(|attempt| *attempt).unwrap_or(0)
    }
}

/// Every `period`, drops the counters of identities that vanished while still failing.
///
/// A deleted object is never reconciled again, so its counter would otherwise
/// never be reset.
pub async fn forget_vanished(backoff: &Backoff, period: Duration, shutdown: &CancellationToken, known: impl Fn(&ResourceIdentity) -> bool) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {
                let forgotten = backoff.retain(&known);
                if forgotten > 0 {
                    log::debug!("Dropped backoff state of {forgotten} vanished WebDeployments");
                }
            }
        }
    }
}

/// an error handler that will be called when the reconciler fails with access to both the
/// object that caused the failure and the actual error
pub fn error_policy(obj: Arc<WebDeployment>, error: &Error, ctx: Arc<ContextData>) -> Action {
    match ResourceIdentity::of(obj.as_ref()) {
        Ok(identity) => {
            let delay = ctx.backoff.next_delay(&identity);
            log::warn!("Reconciliation of {identity} failed, retrying in {delay:?} - {error}");
            Action::requeue(delay)
        }
        Err(err) => {
            log::error!("Cannot requeue reconciliation failure ({error}) - {err}");
            Action::await_change()
        }
    }
}
