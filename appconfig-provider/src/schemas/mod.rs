//! App Configuration resource schema definitions

pub mod configuration_store;
pub mod feature;
pub mod replica;

use appconfig_core::schema::{AttributeType, ResourceSchema};

/// Schema configuration
///
/// Combines a ResourceSchema with the ARM metadata the provider needs to
/// dispatch it.
pub struct AppConfigSchemaConfig {
    /// ARM resource type (e.g., "Microsoft.AppConfiguration/configurationStores")
    pub azure_type_name: &'static str,
    /// Resource type name as written in configuration
    pub resource_type_name: &'static str,
    /// Whether this resource type uses tags
    pub has_tags: bool,
    /// The resource schema with attribute definitions
    pub schema: ResourceSchema,
}

/// Tags type for Azure resources
pub fn tags_type() -> AttributeType {
    AttributeType::Map(Box::new(AttributeType::String))
}

/// Returns all schema configs supported by this provider
pub fn configs() -> Vec<AppConfigSchemaConfig> {
    vec![
        configuration_store::configuration_store_config(),
        replica::replica_config(),
        feature::feature_config(),
    ]
}

/// Returns all schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    configs().into_iter().map(|c| c.schema).collect()
}

pub fn get_schema_config(resource_type: &str) -> Option<AppConfigSchemaConfig> {
    configs()
        .into_iter()
        .find(|c| c.resource_type_name == resource_type)
}
