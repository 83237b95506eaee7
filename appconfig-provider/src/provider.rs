//! App Configuration Provider implementation
//!
//! This module contains the main provider implementation: dispatch by
//! resource type, per-operation timeouts, and the configuration store and
//! replica handlers. Feature flag handlers live in `feature_flag`.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use appconfig_core::provider::{ProviderError, ProviderErrorKind, ProviderResult};
use appconfig_core::resource::{Resource, ResourceId, State, Value};
use log::{debug, info};

use crate::cache::{EndpointCache, KeyedEndpointCache};
use crate::client::{ApiError, DataPlaneApi, ManagementApi};
use crate::config::{Operation, ProviderConfig};
use crate::http::{ArmClient, DataPlaneClient};
use crate::ids::{ConfigurationStoreId, ReplicaId};
use crate::models::{
    ConfigurationStore, ConfigurationStoreProperties, ConfigurationStoreUpdate, Replica, Sku,
};
use crate::resolver::EndpointResolver;
use crate::schemas::{AppConfigSchemaConfig, get_schema_config};
use crate::utils::{expand_tags, flatten_tags, normalize_location, normalize_sku};

pub const CONFIGURATION_STORE: &str = "app_configuration";
pub const REPLICA: &str = "app_configuration_replica";
pub const FEATURE: &str = "app_configuration_feature";

/// Wrap an API failure, keeping 404s distinguishable
pub(crate) fn api_error(id: &ResourceId, action: impl Display, err: ApiError) -> ProviderError {
    let kind = if err.is_not_found() {
        ProviderErrorKind::NotFound
    } else {
        ProviderErrorKind::Upstream
    };
    ProviderError::new(action.to_string())
        .with_kind(kind)
        .with_cause(err)
        .for_resource(id.clone())
}

pub(crate) fn required_string(resource: &Resource, key: &str) -> ProviderResult<String> {
    resource
        .get_string(key)
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::new(format!("`{}` is required", key))
                .with_kind(ProviderErrorKind::Validation)
                .for_resource(resource.id.clone())
        })
}

fn parse_identifier<T, E: std::error::Error + Send + Sync + 'static>(
    id: &ResourceId,
    parsed: Result<T, E>,
) -> ProviderResult<T> {
    parsed.map_err(|e| {
        ProviderError::new("parsing identifier")
            .with_kind(ProviderErrorKind::Validation)
            .with_cause(e)
            .for_resource(id.clone())
    })
}

/// Azure App Configuration Provider
pub struct AppConfigProvider {
    pub(crate) config: ProviderConfig,
    pub(crate) management: Arc<dyn ManagementApi>,
    pub(crate) data_plane: Arc<dyn DataPlaneApi>,
    pub(crate) resolver: EndpointResolver,
}

impl AppConfigProvider {
    /// Create a provider talking to Azure over HTTP
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let management = ArmClient::new(
            &config.management_endpoint,
            config.subscription_id.clone(),
            config.access_token.clone(),
        )
        .map_err(|e| ProviderError::configuration("invalid management endpoint").with_cause(e))?;
        let data_plane = DataPlaneClient::new(config.data_plane_access_token.clone());

        Ok(Self::with_clients(
            config,
            Arc::new(management),
            Arc::new(data_plane),
            Arc::new(KeyedEndpointCache::new()),
        ))
    }

    pub fn with_clients(
        config: ProviderConfig,
        management: Arc<dyn ManagementApi>,
        data_plane: Arc<dyn DataPlaneApi>,
        cache: Arc<dyn EndpointCache>,
    ) -> Self {
        let resolver = EndpointResolver::new(management.clone(), cache);
        Self {
            config,
            management,
            data_plane,
            resolver,
        }
    }

    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// Run `fut` under the configured timeout for `operation`
    async fn with_timeout<T>(
        &self,
        operation: Operation,
        id: &ResourceId,
        fut: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        let limit = self.config.timeouts.for_operation(operation);
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::new(format!(
                "{} did not complete within {:?}",
                operation, limit
            ))
            .with_kind(ProviderErrorKind::Timeout)
            .for_resource(id.clone())),
        }
    }

    fn schema_config(&self, id: &ResourceId) -> ProviderResult<AppConfigSchemaConfig> {
        get_schema_config(&id.resource_type).ok_or_else(|| {
            ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                .with_kind(ProviderErrorKind::Validation)
                .for_resource(id.clone())
        })
    }

    /// Validate against the schema and return attributes with defaults applied
    fn prepare(&self, resource: &Resource) -> ProviderResult<Resource> {
        let config = self.schema_config(&resource.id)?;
        config.schema.validate(&resource.attributes).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ProviderError::new(messages.join("; "))
                .with_kind(ProviderErrorKind::Validation)
                .for_resource(resource.id.clone())
        })?;

        let mut prepared = resource.clone();
        config.schema.apply_defaults(&mut prepared.attributes);
        Ok(prepared)
    }

    /// Poll a provisioning state until it settles
    async fn wait_for_provisioning<F, Fut>(&self, id: &ResourceId, mut poll: F) -> ProviderResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<Option<String>>>,
    {
        loop {
            let state = poll().await?;
            let normalized = state.as_deref().map(str::to_ascii_lowercase);
            match normalized.as_deref() {
                None | Some("succeeded") => return Ok(()),
                Some("failed") | Some("canceled") => {
                    return Err(ProviderError::new(format!(
                        "provisioning finished in state {:?}",
                        state.as_deref().unwrap_or_default()
                    ))
                    .for_resource(id.clone()));
                }
                Some(other) => {
                    debug!("{} is provisioning ({})", id, other);
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    pub async fn read_resource(
        &self,
        resource_type: &str,
        name: &str,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let id = ResourceId::new(resource_type, name);
        self.schema_config(&id)?;

        let Some(identifier) = identifier else {
            return Ok(State::not_found(id));
        };

        self.with_timeout(Operation::Read, &id, async {
            match resource_type {
                CONFIGURATION_STORE => self.read_store(&id, identifier).await,
                REPLICA => self.read_replica(&id, identifier).await,
                _ => self.read_feature(&id, identifier).await,
            }
        })
        .await
    }

    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let resource = self.prepare(&resource)?;
        let id = resource.id.clone();

        self.with_timeout(Operation::Create, &id, async {
            match id.resource_type.as_str() {
                CONFIGURATION_STORE => self.create_store(&resource).await,
                REPLICA => self.create_replica(&resource).await,
                _ => self.create_feature(&resource).await,
            }
        })
        .await
    }

    pub async fn update_resource(
        &self,
        id: ResourceId,
        identifier: &str,
        to: Resource,
    ) -> ProviderResult<State> {
        let to = self.prepare(&to)?;

        self.with_timeout(Operation::Update, &id, async {
            match id.resource_type.as_str() {
                CONFIGURATION_STORE => self.update_store(&id, identifier, &to).await,
                REPLICA => self.read_replica(&id, identifier).await,
                _ => self.update_feature(&id, identifier, &to).await,
            }
        })
        .await
    }

    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        self.schema_config(id)?;

        self.with_timeout(Operation::Delete, id, async {
            match id.resource_type.as_str() {
                CONFIGURATION_STORE => self.delete_store(id, identifier).await,
                REPLICA => self.delete_replica(id, identifier).await,
                _ => self.delete_feature(id, identifier).await,
            }
        })
        .await
    }

    // =========================================================================
    // Configuration stores
    // =========================================================================

    async fn read_store(&self, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
        let store_id = parse_identifier(id, ConfigurationStoreId::parse_insensitively(identifier))?;

        let store = match self.management.get_configuration_store(&store_id).await {
            Ok(store) => store,
            Err(e) if e.is_not_found() => {
                info!("{} was not found - removing from state", store_id);
                self.resolver.remove_from_cache(&store_id, None).await;
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => return Err(api_error(id, format!("retrieving {}", store_id), e)),
        };

        let attributes = flatten_store(&store_id, &store);
        if let Some(Value::String(endpoint)) = attributes.get("endpoint") {
            self.resolver.add_to_cache(&store_id, None, endpoint).await;
        }

        Ok(State::existing(id.clone(), attributes).with_identifier(store_id.id()))
    }

    async fn create_store(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let store_id = ConfigurationStoreId::new(
            self.config.subscription_id.clone(),
            required_string(resource, "resource_group_name")?,
            required_string(resource, "name")?,
        );

        match self.management.get_configuration_store(&store_id).await {
            Ok(_) => return Err(ProviderError::requires_import(&store_id.id()).for_resource(id.clone())),
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(api_error(
                    id,
                    format!("checking for presence of existing {}", store_id),
                    e,
                ));
            }
        }

        let payload = expand_store(resource)?;
        info!("creating {}", store_id);
        self.management
            .create_configuration_store(&store_id, &payload)
            .await
            .map_err(|e| api_error(id, format!("creating {}", store_id), e))?;

        self.wait_for_store(id, &store_id).await?;
        self.read_store(id, &store_id.id()).await
    }

    async fn update_store(
        &self,
        id: &ResourceId,
        identifier: &str,
        to: &Resource,
    ) -> ProviderResult<State> {
        let store_id = parse_identifier(id, ConfigurationStoreId::parse_insensitively(identifier))?;
        let expanded = expand_store(to)?;

        let update = ConfigurationStoreUpdate {
            sku: Some(expanded.sku),
            properties: expanded.properties.map(|p| ConfigurationStoreProperties {
                disable_local_auth: p.disable_local_auth,
                public_network_access: p.public_network_access,
                enable_purge_protection: p.enable_purge_protection,
                ..Default::default()
            }),
            tags: Some(expanded.tags),
        };

        info!("updating {}", store_id);
        self.management
            .update_configuration_store(&store_id, &update)
            .await
            .map_err(|e| api_error(id, format!("updating {}", store_id), e))?;

        self.wait_for_store(id, &store_id).await?;
        self.read_store(id, &store_id.id()).await
    }

    async fn delete_store(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let store_id = parse_identifier(id, ConfigurationStoreId::parse_insensitively(identifier))?;

        info!("deleting {}", store_id);
        match self.management.delete_configuration_store(&store_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!("{} was already gone", store_id),
            Err(e) => return Err(api_error(id, format!("deleting {}", store_id), e)),
        }

        self.resolver.remove_from_cache(&store_id, None).await;
        Ok(())
    }

    async fn wait_for_store(
        &self,
        id: &ResourceId,
        store_id: &ConfigurationStoreId,
    ) -> ProviderResult<()> {
        let management = &self.management;
        self.wait_for_provisioning(id, move || async move {
            let store = management
                .get_configuration_store(store_id)
                .await
                .map_err(|e| api_error(id, format!("polling {}", store_id), e))?;
            Ok::<_, ProviderError>(store.properties.and_then(|p| p.provisioning_state))
        })
        .await
    }

    // =========================================================================
    // Replicas
    // =========================================================================

    async fn read_replica(&self, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
        let replica_id = parse_identifier(id, ReplicaId::parse_insensitively(identifier))?;

        let replica = match self.management.get_replica(&replica_id).await {
            Ok(replica) => replica,
            Err(e) if e.is_not_found() => {
                info!("{} was not found - removing from state", replica_id);
                self.resolver
                    .remove_from_cache(&replica_id.store, Some(&replica_id.replica_name))
                    .await;
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => return Err(api_error(id, format!("retrieving {}", replica_id), e)),
        };

        let attributes = flatten_replica(&replica_id, &replica);
        if let Some(Value::String(endpoint)) = attributes.get("endpoint") {
            self.resolver
                .add_to_cache(&replica_id.store, Some(&replica_id.replica_name), endpoint)
                .await;
        }

        Ok(State::existing(id.clone(), attributes).with_identifier(replica_id.id()))
    }

    async fn create_replica(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let store_id = parse_identifier(
            id,
            ConfigurationStoreId::parse_insensitively(&required_string(
                resource,
                "configuration_store_id",
            )?),
        )?;
        let name = required_string(resource, "name")?;
        let replica_id = ReplicaId::new(store_id.clone(), name.clone());

        if self.resolver.exists(&store_id, Some(&name)).await? {
            return Err(ProviderError::requires_import(&replica_id.id()).for_resource(id.clone()));
        }

        let payload = Replica {
            location: Some(normalize_location(&required_string(resource, "location")?)),
            ..Default::default()
        };
        info!("creating {}", replica_id);
        self.management
            .create_replica(&replica_id, &payload)
            .await
            .map_err(|e| api_error(id, format!("creating {}", replica_id), e))?;

        let management = &self.management;
        let polled = &replica_id;
        self.wait_for_provisioning(id, move || async move {
            let replica = management
                .get_replica(polled)
                .await
                .map_err(|e| api_error(id, format!("polling {}", polled), e))?;
            Ok::<_, ProviderError>(replica.properties.and_then(|p| p.provisioning_state))
        })
        .await?;

        self.read_replica(id, &replica_id.id()).await
    }

    async fn delete_replica(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let replica_id = parse_identifier(id, ReplicaId::parse_insensitively(identifier))?;

        info!("deleting {}", replica_id);
        match self.management.delete_replica(&replica_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!("{} was already gone", replica_id),
            Err(e) => return Err(api_error(id, format!("deleting {}", replica_id), e)),
        }

        self.resolver
            .remove_from_cache(&replica_id.store, Some(&replica_id.replica_name))
            .await;
        Ok(())
    }
}

// =============================================================================
// Expand / flatten
// =============================================================================

fn expand_store(resource: &Resource) -> ProviderResult<ConfigurationStore> {
    let location = required_string(resource, "location")?;
    let sku = resource.get_string("sku").unwrap_or("standard");

    Ok(ConfigurationStore {
        location: normalize_location(&location),
        sku: Sku {
            name: normalize_sku(sku),
        },
        properties: Some(ConfigurationStoreProperties {
            disable_local_auth: Some(!resource.get_bool("local_auth_enabled").unwrap_or(true)),
            public_network_access: resource.get_string("public_network_access").map(str::to_string),
            enable_purge_protection: resource.get_bool("purge_protection_enabled"),
            soft_delete_retention_in_days: resource.get_int("soft_delete_retention_days"),
            ..Default::default()
        }),
        tags: expand_tags(resource.attributes.get("tags")),
        ..Default::default()
    })
}

fn flatten_store(store_id: &ConfigurationStoreId, store: &ConfigurationStore) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    attributes.insert(
        "name".to_string(),
        Value::String(store_id.configuration_store_name.clone()),
    );
    attributes.insert(
        "resource_group_name".to_string(),
        Value::String(store_id.resource_group_name.clone()),
    );
    attributes.insert(
        "location".to_string(),
        Value::String(normalize_location(&store.location)),
    );
    attributes.insert("sku".to_string(), Value::String(normalize_sku(&store.sku.name)));
    attributes.insert("id".to_string(), Value::String(store_id.id()));

    if let Some(props) = &store.properties {
        attributes.insert(
            "local_auth_enabled".to_string(),
            Value::Bool(!props.disable_local_auth.unwrap_or(false)),
        );
        attributes.insert(
            "purge_protection_enabled".to_string(),
            Value::Bool(props.enable_purge_protection.unwrap_or(false)),
        );
        if let Some(access) = &props.public_network_access {
            attributes.insert(
                "public_network_access".to_string(),
                Value::String(access.clone()),
            );
        }
        if let Some(days) = props.soft_delete_retention_in_days {
            attributes.insert("soft_delete_retention_days".to_string(), Value::Int(days));
        }
        if let Some(endpoint) = &props.endpoint {
            attributes.insert("endpoint".to_string(), Value::String(endpoint.clone()));
        }
    }

    if let Some(tags) = flatten_tags(&store.tags) {
        attributes.insert("tags".to_string(), tags);
    }
    attributes
}

fn flatten_replica(replica_id: &ReplicaId, replica: &Replica) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    attributes.insert(
        "configuration_store_id".to_string(),
        Value::String(replica_id.store.id()),
    );
    attributes.insert(
        "name".to_string(),
        Value::String(replica_id.replica_name.clone()),
    );
    attributes.insert("id".to_string(), Value::String(replica_id.id()));
    if let Some(location) = &replica.location {
        attributes.insert(
            "location".to_string(),
            Value::String(normalize_location(location)),
        );
    }
    if let Some(endpoint) = replica.properties.as_ref().and_then(|p| p.endpoint.as_ref()) {
        attributes.insert("endpoint".to_string(), Value::String(endpoint.clone()));
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::testing::{FakeDataPlane, FakeManagement};
    use std::time::Duration;

    fn provider(management: Arc<FakeManagement>) -> AppConfigProvider {
        let mut config = ProviderConfig::new("sub");
        config.poll_interval = Duration::from_millis(1);
        AppConfigProvider::with_clients(
            config,
            management,
            Arc::new(FakeDataPlane::new()),
            Arc::new(KeyedEndpointCache::new()),
        )
    }

    fn store_resource() -> Resource {
        Resource::new(CONFIGURATION_STORE, "main")
            .with_attribute("name", Value::String("main-store".to_string()))
            .with_attribute("resource_group_name", Value::String("rg".to_string()))
            .with_attribute("location", Value::String("West Europe".to_string()))
            .with_attribute(
                "tags",
                Value::Map(
                    [("env".to_string(), Value::String("prod".to_string()))]
                        .into_iter()
                        .collect(),
                ),
            )
    }

    fn store_id() -> ConfigurationStoreId {
        ConfigurationStoreId::new("sub", "rg", "main-store")
    }

    #[tokio::test]
    async fn create_store_applies_defaults_and_caches_endpoint() {
        let management = Arc::new(FakeManagement::new());
        let provider = provider(management.clone());

        let state = provider.create_resource(store_resource()).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier, Some(store_id().id()));
        assert_eq!(
            state.attributes.get("location"),
            Some(&Value::String("westeurope".to_string()))
        );
        assert_eq!(
            state.attributes.get("sku"),
            Some(&Value::String("standard".to_string()))
        );
        assert_eq!(
            state.attributes.get("local_auth_enabled"),
            Some(&Value::Bool(true))
        );

        let stored = management.store(&store_id()).unwrap();
        assert_eq!(stored.properties.unwrap().disable_local_auth, Some(false));

        let cached = provider
            .resolver()
            .cache()
            .lookup(&CacheKey::new("main-store", ""))
            .await;
        assert_eq!(
            cached.map(|d| d.data_plane_endpoint),
            Some("https://main-store.azconfig.io".to_string())
        );
    }

    #[tokio::test]
    async fn create_existing_store_requires_import() {
        let management = Arc::new(FakeManagement::new());
        management.add_store(&store_id(), "https://main-store.azconfig.io");
        let provider = provider(management);

        let err = provider.create_resource(store_resource()).await.unwrap_err();
        assert!(err.requires_import_error());
        assert!(err.message.contains(&store_id().id()));
    }

    #[tokio::test]
    async fn create_rejects_invalid_attributes() {
        let provider = provider(Arc::new(FakeManagement::new()));
        let resource = store_resource().with_attribute("sku", Value::String("gold".to_string()));

        let err = provider.create_resource(resource).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Validation);
    }

    #[tokio::test]
    async fn read_missing_store_is_not_found_and_uncached() {
        let management = Arc::new(FakeManagement::new());
        let provider = provider(management);
        provider
            .resolver()
            .add_to_cache(&store_id(), None, "https://main-store.azconfig.io")
            .await;

        let state = provider
            .read_resource(CONFIGURATION_STORE, "main", Some(&store_id().id()))
            .await
            .unwrap();
        assert!(!state.exists);
        assert!(
            provider
                .resolver()
                .cache()
                .lookup(&CacheKey::new("main-store", ""))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn read_without_identifier_is_not_found() {
        let provider = provider(Arc::new(FakeManagement::new()));
        let state = provider
            .read_resource(CONFIGURATION_STORE, "main", None)
            .await
            .unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn update_store_patches_mutable_fields() {
        let management = Arc::new(FakeManagement::new());
        let provider = provider(management.clone());
        let state = provider.create_resource(store_resource()).await.unwrap();

        let to = store_resource()
            .with_attribute("sku", Value::String("premium".to_string()))
            .with_attribute("local_auth_enabled", Value::Bool(false));
        let updated = provider
            .update_resource(
                state.id.clone(),
                state.identifier.as_deref().unwrap(),
                to,
            )
            .await
            .unwrap();

        assert_eq!(
            updated.attributes.get("sku"),
            Some(&Value::String("premium".to_string()))
        );
        assert_eq!(
            updated.attributes.get("local_auth_enabled"),
            Some(&Value::Bool(false))
        );
    }

    #[tokio::test]
    async fn delete_store_invalidates_cache() {
        let management = Arc::new(FakeManagement::new());
        let provider = provider(management.clone());
        let state = provider.create_resource(store_resource()).await.unwrap();

        provider
            .delete_resource(&state.id, state.identifier.as_deref().unwrap())
            .await
            .unwrap();

        assert!(management.store(&store_id()).is_none());
        assert!(!provider.resolver().exists(&store_id(), None).await.unwrap());
    }

    #[tokio::test]
    async fn replica_lifecycle() {
        let management = Arc::new(FakeManagement::new());
        management.add_store(&store_id(), "https://main-store.azconfig.io");
        let provider = provider(management.clone());

        let resource = Resource::new(REPLICA, "west")
            .with_attribute("configuration_store_id", Value::String(store_id().id()))
            .with_attribute("name", Value::String("westus".to_string()))
            .with_attribute("location", Value::String("West US".to_string()));

        let state = provider.create_resource(resource.clone()).await.unwrap();
        assert_eq!(
            state.attributes.get("endpoint"),
            Some(&Value::String(
                "https://main-store-westus.azconfig.io".to_string()
            ))
        );
        assert_eq!(
            provider
                .resolver()
                .endpoint_for_store(&store_id(), Some("westus"))
                .await
                .unwrap()
                .as_deref(),
            Some("https://main-store-westus.azconfig.io")
        );

        let err = provider.create_resource(resource).await.unwrap_err();
        assert!(err.requires_import_error());

        let identifier = state.identifier.unwrap();
        provider.delete_resource(&state.id, &identifier).await.unwrap();
        assert!(!management.has_replica(&ReplicaId::new(store_id(), "westus")));

        let state = provider
            .read_resource(REPLICA, "west", Some(&identifier))
            .await
            .unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn operations_time_out() {
        let management = Arc::new(FakeManagement::new().with_delay(Duration::from_millis(200)));
        let mut config = ProviderConfig::new("sub");
        config.timeouts.read = Duration::from_millis(10);
        let provider = AppConfigProvider::with_clients(
            config,
            management,
            Arc::new(FakeDataPlane::new()),
            Arc::new(KeyedEndpointCache::new()),
        );

        let err = provider
            .read_resource(CONFIGURATION_STORE, "main", Some(&store_id().id()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Timeout);
    }

    #[tokio::test]
    async fn unknown_resource_type() {
        let provider = provider(Arc::new(FakeManagement::new()));
        let err = provider
            .read_resource("app_service", "x", Some("id"))
            .await
            .unwrap_err();
        assert!(err.message.contains("Unknown resource type"));
    }
}
