//! API seams
//!
//! The provider talks to Azure through two traits: `ManagementApi` for the
//! ARM control plane and `DataPlaneApi` for a store's key-values. The
//! reqwest-backed implementations live in `http`.

use async_trait::async_trait;

use crate::ids::{ConfigurationStoreId, ReplicaId};
use crate::models::{ConfigurationStore, ConfigurationStoreUpdate, KeyValue, Replica};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Azure Resource Manager operations for App Configuration
#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn get_configuration_store(&self, id: &ConfigurationStoreId)
    -> ApiResult<ConfigurationStore>;

    async fn create_configuration_store(
        &self,
        id: &ConfigurationStoreId,
        store: &ConfigurationStore,
    ) -> ApiResult<ConfigurationStore>;

    async fn update_configuration_store(
        &self,
        id: &ConfigurationStoreId,
        update: &ConfigurationStoreUpdate,
    ) -> ApiResult<ConfigurationStore>;

    async fn delete_configuration_store(&self, id: &ConfigurationStoreId) -> ApiResult<()>;

    async fn get_replica(&self, id: &ReplicaId) -> ApiResult<Replica>;

    async fn create_replica(&self, id: &ReplicaId, replica: &Replica) -> ApiResult<Replica>;

    async fn delete_replica(&self, id: &ReplicaId) -> ApiResult<()>;

    /// IDs of every configuration store named `name` in the subscription,
    /// across all result pages
    async fn list_configuration_store_ids_by_name(&self, name: &str) -> ApiResult<Vec<String>>;
}

/// Key-value operations against a store's data-plane endpoint
#[async_trait]
pub trait DataPlaneApi: Send + Sync {
    async fn get_key_value(&self, endpoint: &str, key: &str, label: &str) -> ApiResult<KeyValue>;

    async fn put_key_value(&self, endpoint: &str, key_value: &KeyValue) -> ApiResult<KeyValue>;

    async fn delete_key_value(&self, endpoint: &str, key: &str, label: &str) -> ApiResult<()>;
}
