use std::future::Future;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use kube::Client;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::config::OperatorConfig;
use crate::model::error::Error;
use crate::model::spec::WebDeployment;
use crate::policy::error::Backoff;
use crate::service::cluster_svc::KubeResourceClient;
use crate::service::reconciler_svc::ReconcilerService;

pub type KubeReconciler = ReconcilerService<KubeResourceClient<WebDeployment>, KubeResourceClient<Deployment>>;

pub struct ContextData {
    pub reconciler: KubeReconciler,
    pub config: OperatorConfig,
    pub backoff: Backoff,
    /// Cancelled on shutdown, every pass runs under a child token.
    pub shutdown: CancellationToken,
}

impl ContextData {
    pub fn new(client: Client, config: OperatorConfig, shutdown: CancellationToken) -> Self {
        let reconciler = ReconcilerService::new(
            KubeResourceClient::new(client.clone(), &config.field_manager),
            KubeResourceClient::new(client, &config.field_manager),
            Default::default(),
        );
        let backoff = Backoff::new(config.backoff_base(), config.backoff_max());
        Self {
            reconciler,
            config,
            backoff,
            shutdown,
        }
    }

    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(self.shutdown.child_token(), self.config.request_timeout())
    }
}

/// Caller supplied bounds for a single reconciliation pass.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancellation: CancellationToken,
    deadline: Instant,
}

impl RequestContext {
    pub fn new(cancellation: CancellationToken, timeout: Duration) -> Self {
        Self {
            cancellation,
            deadline: Instant::now() + timeout,
        }
    }

    /// Runs an API call, aborting it on cancellation or once the deadline passes.
    pub async fn bound<T, F>(&self, call: F) -> Result<T, Error>
        where F: Future<Output = Result<T, Error>>,
    {
        if self.cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(Error::Cancelled),
            res = tokio::time::timeout_at(self.deadline, call) => res.unwrap_or(Err(Error::Timeout)),
        }
    }
}
