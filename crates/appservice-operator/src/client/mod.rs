//!
//! # Cluster client
//!
//! Narrow view of the cluster key value store used by the operator.
//! Implemented by the Kubernetes client and by an in-memory store.
//!
mod k8;
mod memory;

pub use memory::MemoryClient;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use k8_client::meta_client::NameSpace;
use k8_types::{InputK8Obj, K8Obj, K8Watch, Spec};

use crate::core::ObjectKey;
use crate::error::StoreError;

pub type SharedClient<C> = Arc<C>;

/// batch of watch events; the outer error means the stream is broken
pub type WatchResult<S> = Result<Vec<Result<K8Watch<S>, StoreError>>, StoreError>;

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// fetch single object, `None` if it does not exist
    async fn retrieve_item<S>(&self, key: &ObjectKey) -> Result<Option<K8Obj<S>>, StoreError>
    where
        S: Spec;

    async fn create_item<S>(&self, value: InputK8Obj<S>) -> Result<K8Obj<S>, StoreError>
    where
        S: Spec;

    /// replace whole object.
    /// rejected if resource version of `value` is not the stored one
    async fn replace_item<S>(&self, value: K8Obj<S>) -> Result<K8Obj<S>, StoreError>
    where
        S: Spec;

    /// stream changes since resource version; starts with existing objects when version is none
    fn watch_stream_since<S>(
        &self,
        namespace: NameSpace,
        resource_version: Option<String>,
    ) -> BoxStream<'_, WatchResult<S>>
    where
        S: Spec + 'static,
        S::Status: 'static,
        S::Header: 'static;
}
