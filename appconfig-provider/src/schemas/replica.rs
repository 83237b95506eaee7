//! app_configuration_replica schema definition
//!
//! ARM type: Microsoft.AppConfiguration/configurationStores/replicas

use super::AppConfigSchemaConfig;
use crate::ids::ConfigurationStoreId;
use appconfig_core::resource::Value;
use appconfig_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// An ARM configuration store ID
pub fn configuration_store_id() -> AttributeType {
    AttributeType::Custom {
        name: "ConfigurationStoreId".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) => ConfigurationStoreId::parse_insensitively(s)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// 1-50 alphanumerics
fn replica_name() -> AttributeType {
    AttributeType::Custom {
        name: "ReplicaName".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s)
                if (1..=50).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                Ok(())
            }
            Value::String(s) => Err(format!(
                "Invalid replica name '{}': must be 1-50 letters or digits",
                s
            )),
            _ => Err("Expected string".to_string()),
        },
    }
}

pub fn replica_config() -> AppConfigSchemaConfig {
    AppConfigSchemaConfig {
        azure_type_name: "Microsoft.AppConfiguration/configurationStores/replicas",
        resource_type_name: "app_configuration_replica",
        has_tags: false,
        schema: ResourceSchema::new("app_configuration_replica")
            .with_description("Manages a geo-replica of an Azure App Configuration store.")
            .attribute(
                AttributeSchema::new("configuration_store_id", configuration_store_id())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("name", replica_name())
                    .required()
                    .force_new()
                    .with_provider_name("name"),
            )
            .attribute(
                AttributeSchema::new("location", types::non_empty_string())
                    .required()
                    .force_new()
                    .with_provider_name("location"),
            )
            .attribute(
                AttributeSchema::new("endpoint", AttributeType::String)
                    .computed()
                    .with_provider_name("properties.endpoint"),
            )
            .attribute(
                AttributeSchema::new("id", AttributeType::String)
                    .computed()
                    .with_provider_name("id"),
            ),
    }
}
