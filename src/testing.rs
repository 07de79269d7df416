//! Test fixtures and an in-memory stand-in for the API server.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;
use kube::Resource;
use serde_json::Value;

use crate::model::error::Error;
use crate::model::identity::ResourceIdentity;
use crate::model::spec::{WebDeployment, WebDeploymentSpec, WebDeploymentStatus};
use crate::service::cluster_svc::{status_patch, ResourceClient, StatusWriter};

pub fn web_deployment(name: &str, replicas: i32) -> WebDeployment {
    let labels: BTreeMap<String, String> = [(String::from("app"), String::from(name))].into_iter().collect();
    let mut parent = WebDeployment::new(name, WebDeploymentSpec {
        deployment: DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: String::from("web"),
                        image: Some(String::from("nginx:1.25")),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        },
    });
    parent.metadata.namespace = Some(String::from("web"));
    parent.metadata.uid = Some(format!("uid-{name}"));
    parent.metadata.generation = Some(1);
    parent
}

/// Namespaced object store with resourceVersion checks and write accounting.
pub struct FakeApi<K> {
    objects: Mutex<BTreeMap<ResourceIdentity, K>>,
    next_version: AtomicU64,
    creates: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
    status_updates: AtomicUsize,
    get_failures: Mutex<VecDeque<Error>>,
    get_delay: Mutex<Option<Duration>>,
    /// Written by "another writer" right before the next create lands.
    create_race: Mutex<Option<K>>,
    /// Simulates another writer touching the object right before each update.
    interfere_on_update: AtomicBool,
}

impl<K> Default for FakeApi<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            next_version: AtomicU64::new(100),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            status_updates: AtomicUsize::new(0),
            get_failures: Mutex::new(VecDeque::new()),
            get_delay: Mutex::new(None),
            create_race: Mutex::new(None),
            interfere_on_update: AtomicBool::new(false),
        }
    }
}

impl<K> FakeApi<K>
    where K: Resource + Clone,
{
    fn bump_version(&self) -> String {
        self.next_version.fetch_add(1, Ordering::SeqCst).to_string()
    }

    /// Seeds an object without counting it as a write.
    pub fn insert(&self, mut obj: K) -> K {
        let identity = ResourceIdentity::of(&obj).expect("fixture without identity");
        if obj.meta().resource_version.is_none() {
            obj.meta_mut().resource_version = Some(self.bump_version());
        }
        self.objects.lock().unwrap().insert(identity, obj.clone());
        obj
    }

    /// Changes an object the way an external actor would, bumping its version.
    pub fn mutate(&self, identity: &ResourceIdentity, change: impl FnOnce(&mut K)) {
        let version = self.bump_version();
        let mut objects = self.objects.lock().unwrap();
        let obj = objects.get_mut(identity).expect("no such object");
        change(obj);
        obj.meta_mut().resource_version = Some(version);
    }

    pub fn remove(&self, identity: &ResourceIdentity) {
        self.objects.lock().unwrap().remove(identity);
    }

    pub fn stored(&self, identity: &ResourceIdentity) -> Option<K> {
        self.objects.lock().unwrap().get(identity).cloned()
    }

    pub fn fail_next_get(&self, err: Error) {
        self.get_failures.lock().unwrap().push_back(err);
    }

    pub fn delay_gets(&self, delay: Duration) {
        *self.get_delay.lock().unwrap() = Some(delay);
    }

    pub fn race_next_create(&self, obj: K) {
        *self.create_race.lock().unwrap() = Some(obj);
    }

    pub fn interfere_on_update(&self, enabled: bool) {
        self.interfere_on_update.store(enabled, Ordering::SeqCst);
    }

    pub fn creates(&self) -> usize { self.creates.load(Ordering::SeqCst) }
    pub fn updates(&self) -> usize { self.updates.load(Ordering::SeqCst) }
    pub fn deletes(&self) -> usize { self.deletes.load(Ordering::SeqCst) }
    pub fn status_updates(&self) -> usize { self.status_updates.load(Ordering::SeqCst) }

    pub fn writes(&self) -> usize {
        self.creates() + self.updates() + self.deletes() + self.status_updates()
    }
}

#[async_trait]
impl<K> ResourceClient<K> for FakeApi<K>
    where K: Resource + Clone + Send + Sync + 'static,
{
    async fn get(&self, identity: &ResourceIdentity) -> Result<Option<K>, Error> {
        let delay = *self.get_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.get_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.stored(identity))
    }

    async fn create(&self, obj: &K) -> Result<K, Error> {
        let identity = ResourceIdentity::of(obj)?;
        let raced = self.create_race.lock().unwrap().take();
        if let Some(raced) = raced {
            self.insert(raced);
        }
        let version = self.bump_version();
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&identity) {
            return Err(Error::Conflict(format!("{identity} already exists")));
        }
        let mut created = obj.clone();
        created.meta_mut().resource_version = Some(version.clone());
        created.meta_mut().uid = Some(format!("uid-{version}"));
        objects.insert(identity, created.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn update(&self, obj: &K) -> Result<K, Error> {
        let identity = ResourceIdentity::of(obj)?;
        if self.interfere_on_update.load(Ordering::SeqCst) {
            self.mutate(&identity, |_| {});
        }
        let version = self.bump_version();
        let mut objects = self.objects.lock().unwrap();
        let Some(current) = objects.get(&identity) else {
            return Err(Error::Unavailable(format!("{identity} not found")));
        };
        if current.meta().resource_version != obj.meta().resource_version {
            return Err(Error::Conflict(format!("{identity} was modified concurrently")));
        }
        let mut updated = obj.clone();
        updated.meta_mut().uid = current.meta().uid.clone();
        updated.meta_mut().resource_version = Some(version);
        objects.insert(identity, updated.clone());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(updated)
    }

    async fn delete(&self, identity: &ResourceIdentity) -> Result<(), Error> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.remove(identity);
        Ok(())
    }
}

/// JSON merge patch (RFC 7386), the way the API server applies `Patch::Merge`.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                apply_merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[async_trait]
impl StatusWriter for FakeApi<WebDeployment> {
    async fn update_status(&self, identity: &ResourceIdentity, status: &WebDeploymentStatus) -> Result<(), Error> {
        let version = self.bump_version();
        let mut objects = self.objects.lock().unwrap();
        let Some(current) = objects.get_mut(identity) else {
            return Err(Error::Unavailable(format!("{identity} not found")));
        };
        let mut merged = serde_json::to_value(&*current).expect("serializable fixture");
        apply_merge_patch(&mut merged, &status_patch(status));
        let mut patched: WebDeployment = serde_json::from_value(merged)
            .map_err(|err| Error::Rejected(format!("status patch produced an invalid object - {err}")))?;
        patched.metadata.resource_version = Some(version);
        *current = patched;
        self.status_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::apps::v1::Deployment;

    use serde_json::json;

    use super::*;
    use crate::model::spec::WebDeploymentPhase;
    use crate::policy::synthesis::synthesize;

    #[tokio::test]
    async fn test_only_one_of_two_stale_updates_wins() {
        let api = FakeApi::<Deployment>::default();
        let parent = web_deployment("site", 2);
        let identity = ResourceIdentity::of(&parent).unwrap();
        api.insert(synthesize(&parent).unwrap());

        let mut first = api.get(&identity).await.unwrap().unwrap();
        let mut second = first.clone();
        first.spec.as_mut().unwrap().replicas = Some(3);
        second.spec.as_mut().unwrap().replicas = Some(4);

        let outcomes = [api.update(&first).await, api.update(&second).await];
        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1], Err(Error::Conflict(_))));
        assert_eq!(api.updates(), 1);
        assert_eq!(api.stored(&identity).unwrap().spec.unwrap().replicas, Some(3));
    }

    #[tokio::test]
    async fn test_create_refuses_duplicates() {
        let api = FakeApi::<Deployment>::default();
        let child = synthesize(&web_deployment("site", 2)).unwrap();
        assert!(api.create(&child).await.is_ok());
        assert!(matches!(api.create(&child).await, Err(Error::Conflict(_))));
        assert_eq!(api.creates(), 1);
    }

    #[test]
    fn test_merge_patch_removes_nulls_and_keeps_unnamed_fields() {
        let mut target = json!({"a": 1, "b": {"c": 2, "d": 3}, "e": "x"});
        apply_merge_patch(&mut target, &json!({"a": null, "b": {"c": null, "f": 4}}));
        assert_eq!(target, json!({"b": {"d": 3, "f": 4}, "e": "x"}));
    }

    #[tokio::test]
    async fn test_status_write_clears_unset_fields() {
        let api = FakeApi::<WebDeployment>::default();
        let parent = api.insert(web_deployment("site", 2));
        let identity = ResourceIdentity::of(&parent).unwrap();

        api.update_status(&identity, &WebDeploymentStatus {
            phase: WebDeploymentPhase::Invalid,
            message: Some(String::from("broken")),
            ready_replicas: Some(2),
            ..Default::default()
        }).await.unwrap();
        api.update_status(&identity, &WebDeploymentStatus {
            phase: WebDeploymentPhase::Synced,
            ..Default::default()
        }).await.unwrap();

        let status = api.stored(&identity).unwrap().status.unwrap();
        assert_eq!(status.phase, WebDeploymentPhase::Synced);
        assert_eq!(status.message, None);
        assert_eq!(status.ready_replicas, None);
    }
}
