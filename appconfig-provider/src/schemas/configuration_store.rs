//! app_configuration schema definition
//!
//! ARM type: Microsoft.AppConfiguration/configurationStores

use super::{AppConfigSchemaConfig, tags_type};
use appconfig_core::resource::Value;
use appconfig_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

pub const SKUS: &[&str] = &["free", "standard", "premium"];
pub const PUBLIC_NETWORK_ACCESS: &[&str] = &["Enabled", "Disabled"];

/// 5-50 alphanumerics or hyphens
pub fn configuration_store_name() -> AttributeType {
    AttributeType::Custom {
        name: "ConfigurationStoreName".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s)
                if (5..=50).contains(&s.len())
                    && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') =>
            {
                Ok(())
            }
            Value::String(s) => Err(format!(
                "Invalid configuration store name '{}': must be 5-50 characters of letters, digits and hyphens",
                s
            )),
            _ => Err("Expected string".to_string()),
        },
    }
}

fn soft_delete_retention_days() -> AttributeType {
    AttributeType::Custom {
        name: "SoftDeleteRetentionDays".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value {
            Value::Int(n) if (1..=7).contains(n) => Ok(()),
            Value::Int(n) => Err(format!("Value {} must be between 1 and 7", n)),
            _ => Err("Expected integer".to_string()),
        },
    }
}

fn enum_of(values: &[&str]) -> AttributeType {
    AttributeType::Enum(values.iter().map(|s| s.to_string()).collect())
}

pub fn configuration_store_config() -> AppConfigSchemaConfig {
    AppConfigSchemaConfig {
        azure_type_name: "Microsoft.AppConfiguration/configurationStores",
        resource_type_name: "app_configuration",
        has_tags: true,
        schema: ResourceSchema::new("app_configuration")
            .with_description("Manages an Azure App Configuration store.")
            .attribute(
                AttributeSchema::new("name", configuration_store_name())
                    .required()
                    .force_new()
                    .with_provider_name("name"),
            )
            .attribute(
                AttributeSchema::new("resource_group_name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("location", types::non_empty_string())
                    .required()
                    .force_new()
                    .with_provider_name("location"),
            )
            .attribute(
                AttributeSchema::new("sku", enum_of(SKUS))
                    .with_default(Value::String("standard".to_string()))
                    .with_provider_name("sku.name"),
            )
            .attribute(
                AttributeSchema::new("local_auth_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(true))
                    .with_description("Inverted into disableLocalAuth")
                    .with_provider_name("properties.disableLocalAuth"),
            )
            .attribute(
                AttributeSchema::new("public_network_access", enum_of(PUBLIC_NETWORK_ACCESS))
                    .with_provider_name("properties.publicNetworkAccess"),
            )
            .attribute(
                AttributeSchema::new("purge_protection_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false))
                    .with_provider_name("properties.enablePurgeProtection"),
            )
            .attribute(
                AttributeSchema::new("soft_delete_retention_days", soft_delete_retention_days())
                    .with_default(Value::Int(7))
                    .force_new()
                    .with_provider_name("properties.softDeleteRetentionInDays"),
            )
            .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("tags"))
            .attribute(
                AttributeSchema::new("endpoint", AttributeType::String)
                    .computed()
                    .with_description("Data-plane endpoint (read-only)")
                    .with_provider_name("properties.endpoint"),
            )
            .attribute(
                AttributeSchema::new("id", AttributeType::String)
                    .computed()
                    .with_provider_name("id"),
            ),
    }
}
