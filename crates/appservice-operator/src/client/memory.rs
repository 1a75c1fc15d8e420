//!
//! # In-memory cluster
//!
//! Keeps objects as json values per kind. Mirrors the store behaviour the operator
//! relies on: resource versions with optimistic concurrency, immutable fields,
//! and watch streams. Also counts writes and can inject failures.
//!
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_channel::{Receiver, Sender, unbounded};
use async_lock::{Mutex, RwLock};
use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::Value;
use tracing::{debug, trace};

use k8_client::meta_client::NameSpace;
use k8_types::{InputK8Obj, K8Obj, K8Watch, ObjectMeta, Spec};

use crate::core::ObjectKey;
use crate::error::StoreError;

use super::{ClusterClient, WatchResult};

const DELETION_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

#[derive(Debug, Clone)]
enum Change {
    Added(Value),
    Modified(Value),
    Deleted(Value),
}

#[derive(Debug, Default)]
struct KindState {
    objects: BTreeMap<ObjectKey, Value>,
    watchers: Vec<(Option<String>, Sender<Change>)>,
}

impl KindState {
    fn publish(&mut self, key: &ObjectKey, change: Change) {
        self.watchers.retain(|(namespace, sender)| {
            if !in_scope(namespace, key) {
                return !sender.is_closed();
            }
            sender.try_send(change.clone()).is_ok()
        });
    }
}

#[derive(Debug, Default)]
struct KindStore {
    state: RwLock<KindState>,
    immutable_fields: RwLock<Vec<String>>,
    writes: AtomicUsize,
    failures: AtomicUsize,
}

impl KindStore {
    /// consume one injected failure, if any
    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| {
                pending.checked_sub(1)
            })
            .is_ok()
    }
}

/// In-memory implementation of [`ClusterClient`]
#[derive(Debug, Default)]
pub struct MemoryClient {
    stores: Mutex<HashMap<String, Arc<KindStore>>>,
    uid: AtomicU64,
}

impl MemoryClient {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn get_store<S: Spec>(&self) -> Arc<KindStore> {
        let kind: String = S::kind();
        let mut stores = self.stores.lock().await;
        stores.entry(kind).or_default().clone()
    }

    /// reject replace requests that change value at json `pointer` once it is set
    pub async fn immutable_field<S: Spec>(&self, pointer: &str) {
        let store = self.get_store::<S>().await;
        store.immutable_fields.write().await.push(pointer.to_owned());
    }

    /// next write of kind `S` fails with remote error
    pub async fn inject_failure<S: Spec>(&self) {
        let store = self.get_store::<S>().await;
        store.failures.fetch_add(1, Ordering::SeqCst);
    }

    /// number of successful create and replace of kind `S`
    pub async fn writes<S: Spec>(&self) -> usize {
        self.get_store::<S>().await.writes.load(Ordering::SeqCst)
    }

    pub async fn total_writes(&self) -> usize {
        let stores = self.stores.lock().await;
        stores
            .values()
            .map(|store| store.writes.load(Ordering::SeqCst))
            .sum()
    }

    /// set deletion marker like the api server does while finalizing.
    /// not counted as write
    pub async fn mark_deleting<S: Spec>(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let store = self.get_store::<S>().await;
        let mut state = store.state.write().await;
        let Some(value) = state.objects.get_mut(key) else {
            return Err(not_found::<S>(key));
        };
        if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.insert(
                "deletionTimestamp".to_owned(),
                Value::String(DELETION_TIMESTAMP.to_owned()),
            );
        }
        let change = Change::Modified(value.clone());
        state.publish(key, change);
        Ok(())
    }

    /// remove object, as garbage collection would
    pub async fn delete_item<S: Spec>(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let store = self.get_store::<S>().await;
        let mut state = store.state.write().await;
        let Some(value) = state.objects.remove(key) else {
            return Err(not_found::<S>(key));
        };
        debug!(%key, kind = %S::kind(), "deleted");
        state.publish(key, Change::Deleted(value));
        Ok(())
    }

    fn next_uid(&self) -> String {
        let id = self.uid.fetch_add(1, Ordering::SeqCst) + 1;
        format!("00000000-0000-0000-0000-{id:012}")
    }
}

#[async_trait]
impl ClusterClient for MemoryClient {
    async fn retrieve_item<S>(&self, key: &ObjectKey) -> Result<Option<K8Obj<S>>, StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let state = store.state.read().await;
        let Some(value) = state.objects.get(key) else {
            return Ok(None);
        };
        let output = value.clone();
        drop(state);

        Ok(Some(decode(output)?))
    }

    async fn create_item<S>(&self, value: InputK8Obj<S>) -> Result<K8Obj<S>, StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let key = ObjectKey::from(&value.metadata);

        if store.take_failure() {
            return Err(injected::<S>(&key));
        }

        let mut state = store.state.write().await;
        if state.objects.contains_key(&key) {
            return Err(StoreError::Conflict {
                kind: S::kind(),
                key: key.to_string(),
                reason: "already exists".to_owned(),
            });
        }

        let metadata = value.metadata;
        let mut k8_obj: K8Obj<S> = K8Obj::new(metadata.name.clone(), value.spec);
        k8_obj.metadata = ObjectMeta {
            name: metadata.name,
            namespace: metadata.namespace,
            uid: self.next_uid(),
            resource_version: "1".to_owned(),
            labels: metadata.labels,
            annotations: metadata.annotations,
            owner_references: metadata.owner_references,
            finalizers: metadata.finalizers,
            ..Default::default()
        };

        let stored = encode(&k8_obj)?;
        state.objects.insert(key.clone(), stored.clone());
        store.writes.fetch_add(1, Ordering::SeqCst);
        debug!(%key, kind = %S::kind(), "created");
        state.publish(&key, Change::Added(stored));

        Ok(k8_obj)
    }

    async fn replace_item<S>(&self, mut value: K8Obj<S>) -> Result<K8Obj<S>, StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let key = ObjectKey::from(&value.metadata);

        if store.take_failure() {
            return Err(injected::<S>(&key));
        }

        let mut state = store.state.write().await;
        let Some(existing) = state.objects.get(&key) else {
            return Err(not_found::<S>(&key));
        };
        let current: K8Obj<S> = decode(existing.clone())?;

        if current.metadata.resource_version != value.metadata.resource_version {
            return Err(StoreError::Conflict {
                kind: S::kind(),
                key: key.to_string(),
                reason: format!(
                    "resource version {} is stale, current is {}",
                    value.metadata.resource_version, current.metadata.resource_version
                ),
            });
        }

        let version = current
            .metadata
            .resource_version
            .parse::<u64>()
            .unwrap_or_default();
        value.metadata.resource_version = (version + 1).to_string();
        value.metadata.uid = current.metadata.uid.clone();

        let updated = encode(&value)?;
        for pointer in store.immutable_fields.read().await.iter() {
            let before = field(existing, pointer);
            if before.is_some() && before != field(&updated, pointer) {
                return Err(StoreError::Invalid {
                    kind: S::kind(),
                    key: key.to_string(),
                    reason: format!("field {pointer} is immutable"),
                });
            }
        }

        state.objects.insert(key.clone(), updated.clone());
        store.writes.fetch_add(1, Ordering::SeqCst);
        debug!(%key, kind = %S::kind(), version = %value.metadata.resource_version, "replaced");
        state.publish(&key, Change::Modified(updated));

        Ok(value)
    }

    fn watch_stream_since<S>(
        &self,
        namespace: NameSpace,
        _resource_version: Option<String>,
    ) -> BoxStream<'_, WatchResult<S>>
    where
        S: Spec + 'static,
        S::Status: 'static,
        S::Header: 'static,
    {
        let ft_stream = async move {
            let store = self.get_store::<S>().await;
            let (sender, receiver): (Sender<Change>, Receiver<Change>) = unbounded();

            let namespace = match namespace {
                NameSpace::All => None,
                NameSpace::Named(name) => Some(name),
            };

            let mut state = store.state.write().await;
            let initial: Vec<Change> = state
                .objects
                .iter()
                .filter(|(key, _)| in_scope(&namespace, key))
                .map(|(_, value)| Change::Added(value.clone()))
                .collect();
            state.watchers.push((namespace, sender));
            drop(state);

            trace!(kind = %S::kind(), initial = initial.len(), "watch started");

            let snapshot = futures_util::stream::once(async move {
                let events: WatchResult<S> = Ok(initial.into_iter().map(into_watch::<S>).collect());
                events
            });
            let changes = receiver.map(|change| {
                let events: WatchResult<S> = Ok(vec![into_watch::<S>(change)]);
                events
            });
            snapshot.chain(changes)
        };

        ft_stream.flatten_stream().boxed()
    }
}

fn in_scope(namespace: &Option<String>, key: &ObjectKey) -> bool {
    match namespace {
        None => true,
        Some(name) => *name == key.namespace,
    }
}

/// json value at `pointer`; empty strings count as unset
fn field<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    value.pointer(pointer).filter(|field| match field {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    })
}

fn into_watch<S: Spec>(change: Change) -> Result<K8Watch<S>, StoreError> {
    Ok(match change {
        Change::Added(value) => K8Watch::ADDED(decode(value)?),
        Change::Modified(value) => K8Watch::MODIFIED(decode(value)?),
        Change::Deleted(value) => K8Watch::DELETED(decode(value)?),
    })
}

fn encode<S: Spec>(obj: &K8Obj<S>) -> Result<Value, StoreError> {
    serde_json::to_value(obj).map_err(StoreError::remote)
}

fn decode<S: Spec>(value: Value) -> Result<K8Obj<S>, StoreError> {
    serde_json::from_value(value).map_err(StoreError::remote)
}

fn not_found<S: Spec>(key: &ObjectKey) -> StoreError {
    StoreError::NotFound {
        kind: S::kind(),
        key: key.to_string(),
    }
}

fn injected<S: Spec>(key: &ObjectKey) -> StoreError {
    StoreError::remote(anyhow::anyhow!(
        "injected failure writing {} {key}",
        S::kind()
    ))
}
