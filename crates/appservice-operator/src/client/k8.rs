use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tracing::trace;

use k8_client::K8Client;
use k8_client::meta_client::{MetadataClient, NameSpace};
use k8_types::{InputK8Obj, K8Obj, Spec, UpdatedK8Obj};

use crate::core::ObjectKey;
use crate::error::StoreError;

use super::WatchResult;

#[async_trait]
impl super::ClusterClient for K8Client {
    async fn retrieve_item<S>(&self, key: &ObjectKey) -> Result<Option<K8Obj<S>>, StoreError>
    where
        S: Spec,
    {
        trace!(%key, kind = %S::kind(), "retrieve");
        MetadataClient::retrieve_item::<S, _>(self, &key.as_input_meta())
            .await
            .map_err(StoreError::remote)
    }

    async fn create_item<S>(&self, value: InputK8Obj<S>) -> Result<K8Obj<S>, StoreError>
    where
        S: Spec,
    {
        MetadataClient::create_item(self, value).await.map_err(StoreError::remote)
    }

    async fn replace_item<S>(&self, value: K8Obj<S>) -> Result<K8Obj<S>, StoreError>
    where
        S: Spec,
    {
        let input: UpdatedK8Obj<S> = UpdatedK8Obj::new(value.spec, value.metadata.into());
        K8Client::replace_item(self, input).await.map_err(StoreError::remote)
    }

    fn watch_stream_since<S>(
        &self,
        namespace: NameSpace,
        resource_version: Option<String>,
    ) -> BoxStream<'_, WatchResult<S>>
    where
        S: Spec + 'static,
        S::Status: 'static,
        S::Header: 'static,
    {
        MetadataClient::watch_stream_since::<S, _>(self, namespace, resource_version)
            .map(|result| {
                result
                    .map(|events| {
                        events
                            .into_iter()
                            .map(|event| event.map_err(StoreError::remote))
                            .collect()
                    })
                    .map_err(StoreError::remote)
            })
            .boxed()
    }
}
