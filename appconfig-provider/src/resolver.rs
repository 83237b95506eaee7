//! Data-plane endpoint resolution
//!
//! Looks up the endpoint of a configuration store or replica through the
//! management API, memoizing results in an [`EndpointCache`]. Every
//! resolution runs while holding the key's cache slot, so concurrent callers
//! asking for the same store wait for the first one and then hit the cache.

use std::sync::Arc;

use appconfig_core::provider::{ProviderError, ProviderErrorKind, ProviderResult};
use log::debug;
use url::Url;

use crate::cache::{CacheKey, EndpointCache, StoreDetails};
use crate::client::{ApiError, ManagementApi};
use crate::ids::{ConfigurationStoreId, ReplicaId};

const DATA_PLANE_HOST_SUFFIX: [&str; 2] = ["azconfig", "io"];

/// Extract the store name from `https://{name}.azconfig.io`
pub fn parse_name_from_endpoint(input: &str) -> ProviderResult<String> {
    let uri = Url::parse(input).map_err(|e| {
        ProviderError::new(format!("parsing endpoint {:?}", input))
            .with_kind(ProviderErrorKind::Validation)
            .with_cause(e)
    })?;
    let host = uri.host_str().unwrap_or_default();

    let segments: Vec<&str> = host.split('.').collect();
    if segments.len() < 3
        || segments[0].is_empty()
        || segments[1] != DATA_PLANE_HOST_SUFFIX[0]
        || segments[2] != DATA_PLANE_HOST_SUFFIX[1]
    {
        return Err(ProviderError::new(format!(
            "expected a URI in the format `https://the-appconfiguration.azconfig.io` but got {:?}",
            host
        ))
        .with_kind(ProviderErrorKind::Validation));
    }
    Ok(segments[0].to_string())
}

fn upstream(context: impl std::fmt::Display, err: ApiError) -> ProviderError {
    let kind = if err.is_not_found() {
        ProviderErrorKind::NotFound
    } else {
        ProviderErrorKind::Upstream
    };
    ProviderError::new(format!("retrieving {}", context))
        .with_kind(kind)
        .with_cause(err)
}

/// Resolves data-plane endpoints, backed by the management API and a cache
#[derive(Clone)]
pub struct EndpointResolver {
    management: Arc<dyn ManagementApi>,
    cache: Arc<dyn EndpointCache>,
}

impl EndpointResolver {
    pub fn new(management: Arc<dyn ManagementApi>, cache: Arc<dyn EndpointCache>) -> Self {
        Self { management, cache }
    }

    pub fn cache(&self) -> &Arc<dyn EndpointCache> {
        &self.cache
    }

    fn key_for(store_id: &ConfigurationStoreId, replica: Option<&str>) -> CacheKey {
        CacheKey::new(&store_id.configuration_store_name, replica.unwrap_or_default())
    }

    pub async fn add_to_cache(
        &self,
        store_id: &ConfigurationStoreId,
        replica: Option<&str>,
        endpoint: &str,
    ) {
        let key = Self::key_for(store_id, replica);
        self.cache
            .insert(
                &key,
                StoreDetails {
                    configuration_store_id: store_id.id(),
                    replica_name: replica.map(str::to_string),
                    data_plane_endpoint: endpoint.to_string(),
                },
            )
            .await;
    }

    pub async fn remove_from_cache(&self, store_id: &ConfigurationStoreId, replica: Option<&str>) {
        self.cache.remove(&Self::key_for(store_id, replica)).await;
    }

    /// Data-plane endpoint of a store, or of one of its replicas.
    ///
    /// A missing store is a `NotFound` error; a missing replica of an existing
    /// store is `Ok(None)`.
    pub async fn endpoint_for_store(
        &self,
        store_id: &ConfigurationStoreId,
        replica: Option<&str>,
    ) -> ProviderResult<Option<String>> {
        let mut slot = self.cache.slot(&Self::key_for(store_id, replica)).await;
        if let Some(details) = slot.get() {
            return Ok(Some(details.data_plane_endpoint.clone()));
        }

        match self.fetch_details(store_id, replica).await? {
            Some(details) => {
                let endpoint = details.data_plane_endpoint.clone();
                slot.set(details);
                Ok(Some(endpoint))
            }
            None => Ok(None),
        }
    }

    /// Whether the store (and replica, when given) exists. Cached entries
    /// count as existing without an API call.
    pub async fn exists(
        &self,
        store_id: &ConfigurationStoreId,
        replica: Option<&str>,
    ) -> ProviderResult<bool> {
        let mut slot = self.cache.slot(&Self::key_for(store_id, replica)).await;
        if slot.get().is_some() {
            return Ok(true);
        }

        match self.fetch_details(store_id, replica).await {
            Ok(Some(details)) => {
                slot.set(details);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Find the store (or replica) behind a data-plane endpoint URL.
    ///
    /// Returns `Ok(None)` when nothing matches; callers decide whether that
    /// means "gone from state" or an error.
    pub async fn details_from_endpoint(
        &self,
        endpoint: &str,
    ) -> ProviderResult<Option<StoreDetails>> {
        let name = parse_name_from_endpoint(endpoint)?;

        let mut slot = self.cache.slot(&CacheKey::new(&name, "")).await;
        if let Some(details) = slot.get() {
            return Ok(Some(details.clone()));
        }

        if let Some(store_id) = self.find_store_by_name(&name).await? {
            let details = self.fetch_details(&store_id, None).await?;
            if let Some(details) = &details {
                slot.set(details.clone());
            }
            return Ok(details);
        }

        // A replica endpoint is `{store}-{replica}.azconfig.io`
        if let Some((store_name, replica_name)) = name.rsplit_once('-')
            && !store_name.is_empty()
            && !replica_name.is_empty()
            && let Some(store_id) = self.find_store_by_name(store_name).await?
        {
            let details = self.fetch_details(&store_id, Some(replica_name)).await?;
            if let Some(details) = &details {
                slot.set(details.clone());
            }
            return Ok(details);
        }

        debug!("no configuration store found for endpoint {}", endpoint);
        Ok(None)
    }

    async fn find_store_by_name(&self, name: &str) -> ProviderResult<Option<ConfigurationStoreId>> {
        let ids = self
            .management
            .list_configuration_store_ids_by_name(name)
            .await
            .map_err(|e| {
                ProviderError::new(format!("listing configuration stores named {:?}", name))
                    .with_cause(e)
            })?;

        for raw in ids {
            let id = ConfigurationStoreId::parse_insensitively(&raw).map_err(|e| {
                ProviderError::new(format!("parsing {:?}", raw))
                    .with_kind(ProviderErrorKind::MalformedResponse)
                    .with_cause(e)
            })?;
            if id.configuration_store_name.eq_ignore_ascii_case(name) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Query the management API. The store must exist (`NotFound` error
    /// otherwise); a missing replica yields `Ok(None)`.
    async fn fetch_details(
        &self,
        store_id: &ConfigurationStoreId,
        replica: Option<&str>,
    ) -> ProviderResult<Option<StoreDetails>> {
        debug!("resolving endpoint for {}", store_id);
        let store = self
            .management
            .get_configuration_store(store_id)
            .await
            .map_err(|e| upstream(store_id, e))?;
        let store_endpoint = store
            .properties
            .and_then(|p| p.endpoint)
            .ok_or_else(|| ProviderError::malformed(store_id, "model.properties.endpoint"))?;

        let Some(replica_name) = replica.filter(|r| !r.is_empty()) else {
            return Ok(Some(StoreDetails {
                configuration_store_id: store_id.id(),
                replica_name: None,
                data_plane_endpoint: store_endpoint,
            }));
        };

        let replica_id = ReplicaId::new(store_id.clone(), replica_name);
        let replica = match self.management.get_replica(&replica_id).await {
            Ok(replica) => replica,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(upstream(&replica_id, e)),
        };
        let replica_endpoint = replica
            .properties
            .and_then(|p| p.endpoint)
            .ok_or_else(|| ProviderError::malformed(&replica_id, "model.properties.endpoint"))?;

        Ok(Some(StoreDetails {
            configuration_store_id: store_id.id(),
            replica_name: Some(replica_name.to_string()),
            data_plane_endpoint: replica_endpoint,
        }))
    }
}
