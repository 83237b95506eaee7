//! In-memory API fakes for unit tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{ApiError, ApiResult, DataPlaneApi, ManagementApi};
use crate::ids::{ConfigurationStoreId, ReplicaId};
use crate::models::{
    ConfigurationStore, ConfigurationStoreProperties, ConfigurationStoreUpdate, KeyValue, Replica,
    ReplicaProperties,
};

fn store_key(id: &ConfigurationStoreId) -> String {
    id.id().to_lowercase()
}

fn replica_key(id: &ReplicaId) -> String {
    id.id().to_lowercase()
}

/// Fake ARM control plane. Stores are keyed by lowercased ID.
#[derive(Default)]
pub struct FakeManagement {
    stores: Mutex<HashMap<String, ConfigurationStore>>,
    replicas: Mutex<HashMap<String, Replica>>,
    delay: Option<Duration>,
    fail_next_get: AtomicBool,
    store_gets: AtomicUsize,
    list_calls: AtomicUsize,
}

impl FakeManagement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every store GET
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn add_store(&self, id: &ConfigurationStoreId, endpoint: &str) {
        self.put_store(
            id,
            ConfigurationStore {
                id: Some(id.id()),
                name: Some(id.configuration_store_name.clone()),
                location: "westeurope".to_string(),
                sku: crate::models::Sku {
                    name: "standard".to_string(),
                },
                properties: Some(ConfigurationStoreProperties {
                    provisioning_state: Some("Succeeded".to_string()),
                    endpoint: Some(endpoint.to_string()),
                    disable_local_auth: Some(false),
                    ..Default::default()
                }),
                tags: HashMap::new(),
            },
        );
    }

    pub fn add_store_without_endpoint(&self, id: &ConfigurationStoreId) {
        self.put_store(
            id,
            ConfigurationStore {
                id: Some(id.id()),
                name: Some(id.configuration_store_name.clone()),
                location: "westeurope".to_string(),
                ..Default::default()
            },
        );
    }

    pub fn put_store(&self, id: &ConfigurationStoreId, store: ConfigurationStore) {
        self.stores.lock().unwrap().insert(store_key(id), store);
    }

    pub fn store(&self, id: &ConfigurationStoreId) -> Option<ConfigurationStore> {
        self.stores.lock().unwrap().get(&store_key(id)).cloned()
    }

    pub fn add_replica(&self, store: &ConfigurationStoreId, name: &str, endpoint: &str) {
        let id = ReplicaId::new(store.clone(), name);
        self.replicas.lock().unwrap().insert(
            replica_key(&id),
            Replica {
                id: Some(id.id()),
                name: Some(name.to_string()),
                location: Some("westus".to_string()),
                properties: Some(ReplicaProperties {
                    provisioning_state: Some("Succeeded".to_string()),
                    endpoint: Some(endpoint.to_string()),
                }),
            },
        );
    }

    pub fn has_replica(&self, id: &ReplicaId) -> bool {
        self.replicas.lock().unwrap().contains_key(&replica_key(id))
    }

    /// Make the next store GET fail with a 500
    pub fn fail_next_store_get(&self) {
        self.fail_next_get.store(true, Ordering::SeqCst);
    }

    pub fn store_gets(&self) -> usize {
        self.store_gets.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManagementApi for FakeManagement {
    async fn get_configuration_store(
        &self,
        id: &ConfigurationStoreId,
    ) -> ApiResult<ConfigurationStore> {
        self.store_gets.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_next_get.swap(false, Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        self.store(id).ok_or(ApiError::NotFound)
    }

    async fn create_configuration_store(
        &self,
        id: &ConfigurationStoreId,
        store: &ConfigurationStore,
    ) -> ApiResult<ConfigurationStore> {
        let mut created = store.clone();
        created.id = Some(id.id());
        created.name = Some(id.configuration_store_name.clone());
        let properties = created.properties.get_or_insert_with(Default::default);
        properties.provisioning_state = Some("Succeeded".to_string());
        properties.endpoint = Some(format!(
            "https://{}.azconfig.io",
            id.configuration_store_name.to_lowercase()
        ));
        self.put_store(id, created.clone());
        Ok(created)
    }

    async fn update_configuration_store(
        &self,
        id: &ConfigurationStoreId,
        update: &ConfigurationStoreUpdate,
    ) -> ApiResult<ConfigurationStore> {
        let mut stores = self.stores.lock().unwrap();
        let store = stores.get_mut(&store_key(id)).ok_or(ApiError::NotFound)?;
        if let Some(sku) = &update.sku {
            store.sku = sku.clone();
        }
        if let Some(tags) = &update.tags {
            store.tags = tags.clone();
        }
        if let Some(patch) = &update.properties {
            let properties = store.properties.get_or_insert_with(Default::default);
            if patch.disable_local_auth.is_some() {
                properties.disable_local_auth = patch.disable_local_auth;
            }
            if patch.public_network_access.is_some() {
                properties.public_network_access = patch.public_network_access.clone();
            }
            if patch.enable_purge_protection.is_some() {
                properties.enable_purge_protection = patch.enable_purge_protection;
            }
        }
        Ok(store.clone())
    }

    async fn delete_configuration_store(&self, id: &ConfigurationStoreId) -> ApiResult<()> {
        self.stores
            .lock()
            .unwrap()
            .remove(&store_key(id))
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }

    async fn get_replica(&self, id: &ReplicaId) -> ApiResult<Replica> {
        self.replicas
            .lock()
            .unwrap()
            .get(&replica_key(id))
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn create_replica(&self, id: &ReplicaId, replica: &Replica) -> ApiResult<Replica> {
        let created = Replica {
            id: Some(id.id()),
            name: Some(id.replica_name.clone()),
            location: replica.location.clone(),
            properties: Some(ReplicaProperties {
                provisioning_state: Some("Succeeded".to_string()),
                endpoint: Some(format!(
                    "https://{}-{}.azconfig.io",
                    id.store.configuration_store_name.to_lowercase(),
                    id.replica_name.to_lowercase()
                )),
            }),
        };
        self.replicas
            .lock()
            .unwrap()
            .insert(replica_key(id), created.clone());
        Ok(created)
    }

    async fn delete_replica(&self, id: &ReplicaId) -> ApiResult<()> {
        self.replicas
            .lock()
            .unwrap()
            .remove(&replica_key(id))
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }

    async fn list_configuration_store_ids_by_name(&self, name: &str) -> ApiResult<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let stores = self.stores.lock().unwrap();
        Ok(stores
            .values()
            .filter(|s| {
                s.name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .filter_map(|s| s.id.clone())
            .collect())
    }
}

/// Fake data plane, keyed by `(endpoint, key, label)`
#[derive(Default)]
pub struct FakeDataPlane {
    items: Mutex<HashMap<(String, String, String), KeyValue>>,
    gets: AtomicUsize,
}

impl FakeDataPlane {
    pub fn new() -> Self {
        Self::default()
    }

    fn item_key(endpoint: &str, key: &str, label: &str) -> (String, String, String) {
        (
            endpoint.trim_end_matches('/').to_lowercase(),
            key.to_string(),
            label.to_string(),
        )
    }

    pub fn item(&self, endpoint: &str, key: &str, label: &str) -> Option<KeyValue> {
        self.items
            .lock()
            .unwrap()
            .get(&Self::item_key(endpoint, key, label))
            .cloned()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataPlaneApi for FakeDataPlane {
    async fn get_key_value(&self, endpoint: &str, key: &str, label: &str) -> ApiResult<KeyValue> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.item(endpoint, key, label).ok_or(ApiError::NotFound)
    }

    async fn put_key_value(&self, endpoint: &str, key_value: &KeyValue) -> ApiResult<KeyValue> {
        let label = key_value.label.clone().unwrap_or_default();
        let mut stored = key_value.clone();
        stored.etag = Some(format!("etag-{}", key_value.key.len()));
        self.items.lock().unwrap().insert(
            Self::item_key(endpoint, &key_value.key, &label),
            stored.clone(),
        );
        Ok(stored)
    }

    async fn delete_key_value(&self, endpoint: &str, key: &str, label: &str) -> ApiResult<()> {
        self.items
            .lock()
            .unwrap()
            .remove(&Self::item_key(endpoint, key, label))
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }
}
