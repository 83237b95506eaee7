//! Azure App Configuration Provider
//!
//! Manages configuration stores, their geo-replicas and feature flags.
//!
//! ## Module Structure
//!
//! - `provider` - AppConfigProvider: dispatch, stores and replicas
//! - `feature_flag` - Feature flag handlers
//! - `features` - Feature flag documents and the client filter decoder
//! - `resolver` / `cache` - Data-plane endpoint resolution and its cache
//! - `client` / `http` - API traits and their reqwest implementations
//! - `schemas` / `resources` - Resource schemas and types
//! - `config` - Provider configuration

pub mod cache;
pub mod client;
pub mod config;
mod feature_flag;
pub mod features;
pub mod http;
pub mod ids;
pub mod models;
pub mod provider;
pub mod resolver;
pub mod resources;
pub mod schemas;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export main types
pub use cache::{CacheKey, EndpointCache, KeyedEndpointCache, StoreDetails};
pub use config::ProviderConfig;
pub use provider::AppConfigProvider;
pub use resolver::EndpointResolver;

use appconfig_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use appconfig_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for AppConfigProvider {
    fn name(&self) -> &'static str {
        "azurerm"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move {
            self.read_resource(&id.resource_type, &id.name, identifier.as_deref())
                .await
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let to = to.clone();
        Box::pin(async move { self.update_resource(id, &identifier, to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }
}
