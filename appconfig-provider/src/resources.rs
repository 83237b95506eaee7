//! Resource type definitions (implementing the ResourceType trait)

use appconfig_core::provider::ResourceType;
use appconfig_core::schema::ResourceSchema;

use crate::schemas::{configuration_store, feature, replica};

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $config:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $config().schema
            }
        }
    };
}

define_resource_type!(
    ConfigurationStoreType,
    "app_configuration",
    configuration_store::configuration_store_config
);
define_resource_type!(
    ReplicaType,
    "app_configuration_replica",
    replica::replica_config
);
define_resource_type!(
    FeatureType,
    "app_configuration_feature",
    feature::feature_config
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(ConfigurationStoreType),
        Box::new(ReplicaType),
        Box::new(FeatureType),
    ]
}
