use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::Api,
    Client,
    runtime::controller::{self, Controller},
};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::Config;
use tokio_util::sync::CancellationToken;

use webapp_operator::core::config::{compose_config, OperatorConfig};
use webapp_operator::core::shutdown::{cancel_on, termination_signal};
use webapp_operator::model::context::ContextData;
use webapp_operator::model::spec::WebDeployment;
use webapp_operator::policy::error::{error_policy, forget_vanished};
use webapp_operator::policy::reconciliation::reconcile;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let app_config: OperatorConfig = compose_config("webapp-operator", "webapp_operator")?;
    let kubernetes_client = Client::try_default().await?;

    let shutdown = CancellationToken::new();
    let context = Arc::new(ContextData::new(kubernetes_client.clone(), app_config.clone(), shutdown.clone()));

    let (crd_api, deployment_api) = match &app_config.watch_namespace {
        Some(namespace) => (
            Api::<WebDeployment>::namespaced(kubernetes_client.clone(), namespace),
            Api::<Deployment>::namespaced(kubernetes_client.clone(), namespace),
        ),
        None => (
            Api::<WebDeployment>::all(kubernetes_client.clone()),
            Api::<Deployment>::all(kubernetes_client.clone()),
        ),
    };
    tokio::spawn(cancel_on(termination_signal(), shutdown.clone()));
    let controller_shutdown = shutdown.clone();

    log::info!("Starting webapp-operator, namespace: {}", app_config.watch_namespace.as_deref().unwrap_or("<all>"));

    let controller = Controller::new(crd_api, Config::default())
        .owns(deployment_api, Config::default())
        .with_config(controller::Config::default().concurrency(app_config.concurrency));

    let store = controller.store();
    let pruning_context = context.clone();
    tokio::spawn(async move {
        let ctx = pruning_context;
        forget_vanished(&ctx.backoff, ctx.config.backoff_max(), &ctx.shutdown, |identity| {
            store.get(&ObjectRef::new(&identity.name).within(&identity.namespace)).is_some()
        }).await
    });

    controller
        .graceful_shutdown_on(async move { controller_shutdown.cancelled().await })
        .run(reconcile, error_policy, context)
        .for_each(|reconciliation_result| async move {
            match reconciliation_result {
                Ok((web_deployment, _action)) => {
                    log::debug!("Reconciliation successful. Resource: {web_deployment}");
                }
                Err(reconciliation_err) => {
                    log::warn!("Reconciliation error: {reconciliation_err}")
                }
            }
        })
        .await;

    Ok(())
}
