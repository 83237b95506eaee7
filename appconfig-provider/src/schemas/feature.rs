//! app_configuration_feature schema definition
//!
//! Feature flags live in a store's data plane as key-values under
//! `.appconfig.featureflag/{name}`.

use super::{AppConfigSchemaConfig, tags_type};
use super::replica::configuration_store_id;
use appconfig_core::resource::Value;
use appconfig_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// Feature names may not contain `%` or `:`
fn feature_name() -> AttributeType {
    AttributeType::Custom {
        name: "FeatureName".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if s.is_empty() => Err("Value must not be empty".to_string()),
            Value::String(s) if s.contains('%') || s.contains(':') => Err(format!(
                "Invalid feature name '{}': `%` and `:` are not allowed",
                s
            )),
            Value::String(_) => Ok(()),
            _ => Err("Expected string".to_string()),
        },
    }
}

fn targeting_group() -> AttributeType {
    AttributeType::Block(vec![
        AttributeSchema::new("name", types::non_empty_string()).required(),
        AttributeSchema::new("rollout_percentage", types::percentage()).required(),
    ])
}

pub const DAYS_OF_WEEK: &[&str] = &[
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

fn day_of_week() -> AttributeType {
    AttributeType::Enum(DAYS_OF_WEEK.iter().map(|d| d.to_string()).collect())
}

fn targeting_exclusion() -> AttributeType {
    AttributeType::Block(vec![
        AttributeSchema::new("users", string_list()),
        AttributeSchema::new("groups", string_list()),
    ])
}

fn targeting_filter() -> AttributeType {
    AttributeType::Block(vec![
        AttributeSchema::new("default_rollout_percentage", types::percentage()).required(),
        AttributeSchema::new("users", string_list()),
        AttributeSchema::new("groups", AttributeType::List(Box::new(targeting_group()))),
        AttributeSchema::new(
            "exclusion",
            AttributeType::List(Box::new(targeting_exclusion())),
        ),
    ])
}

fn daily_recurrence() -> AttributeType {
    AttributeType::Block(vec![AttributeSchema::new("interval", AttributeType::Int).required()])
}

fn weekly_recurrence() -> AttributeType {
    AttributeType::Block(vec![
        AttributeSchema::new("interval", AttributeType::Int).required(),
        AttributeSchema::new("first_day_of_week", day_of_week()),
        AttributeSchema::new("days_of_week", AttributeType::List(Box::new(day_of_week())))
            .required(),
    ])
}

fn recurrence() -> AttributeType {
    AttributeType::Block(vec![
        AttributeSchema::new("daily", AttributeType::List(Box::new(daily_recurrence()))),
        AttributeSchema::new("weekly", AttributeType::List(Box::new(weekly_recurrence()))),
        AttributeSchema::new("end_date", types::rfc3339_time()),
    ])
}

fn timewindow_filter() -> AttributeType {
    AttributeType::Block(vec![
        AttributeSchema::new("start", types::rfc3339_time()),
        AttributeSchema::new("end", types::rfc3339_time()),
        AttributeSchema::new("recurrence", AttributeType::List(Box::new(recurrence()))),
    ])
}

pub fn feature_config() -> AppConfigSchemaConfig {
    AppConfigSchemaConfig {
        azure_type_name: "Microsoft.AppConfiguration/configurationStores/keyValues",
        resource_type_name: "app_configuration_feature",
        has_tags: true,
        schema: ResourceSchema::new("app_configuration_feature")
            .with_description("Manages a feature flag in an Azure App Configuration store.")
            .attribute(
                AttributeSchema::new("configuration_store_id", configuration_store_id())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("name", feature_name())
                    .required()
                    .force_new()
                    .with_provider_name("id"),
            )
            .attribute(
                AttributeSchema::new("key", AttributeType::String)
                    .force_new()
                    .with_description("Defaults to .appconfig.featureflag/{name}")
                    .with_provider_name("key"),
            )
            .attribute(
                AttributeSchema::new("label", AttributeType::String)
                    .force_new()
                    .with_provider_name("label"),
            )
            .attribute(
                AttributeSchema::new("description", AttributeType::String)
                    .with_provider_name("description"),
            )
            .attribute(
                AttributeSchema::new("enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false))
                    .with_provider_name("enabled"),
            )
            .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("tags"))
            .attribute(
                AttributeSchema::new("percentage_filter_value", types::percentage_float())
                    .with_provider_name("Microsoft.Percentage"),
            )
            .attribute(
                AttributeSchema::new(
                    "targeting_filter",
                    AttributeType::List(Box::new(targeting_filter())),
                )
                .with_provider_name("Microsoft.Targeting"),
            )
            .attribute(
                AttributeSchema::new(
                    "timewindow_filter",
                    AttributeType::List(Box::new(timewindow_filter())),
                )
                .with_provider_name("Microsoft.TimeWindow"),
            )
            .attribute(
                AttributeSchema::new("etag", AttributeType::String)
                    .computed()
                    .with_provider_name("etag"),
            ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert(
            "configuration_store_id".to_string(),
            Value::String("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.AppConfiguration/configurationStores/main".to_string()),
        );
        attrs.insert("name".to_string(), Value::String("beta".to_string()));
        attrs
    }

    fn block(pairs: Vec<(&str, Value)>) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn accepts_filters() {
        let schema = feature_config().schema;
        let mut attrs = base();
        attrs.insert("percentage_filter_value".to_string(), Value::Int(50));
        attrs.insert(
            "targeting_filter".to_string(),
            Value::List(vec![block(vec![
                ("default_rollout_percentage", Value::Int(10)),
                ("users", Value::List(vec![Value::String("alice".to_string())])),
                (
                    "groups",
                    Value::List(vec![block(vec![
                        ("name", Value::String("beta".to_string())),
                        ("rollout_percentage", Value::Int(75)),
                    ])]),
                ),
            ])]),
        );
        attrs.insert(
            "timewindow_filter".to_string(),
            Value::List(vec![block(vec![(
                "start",
                Value::String("2024-01-01T00:00:00Z".to_string()),
            )])]),
        );
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn accepts_exclusion_and_recurrence() {
        let schema = feature_config().schema;
        let mut attrs = base();
        attrs.insert(
            "targeting_filter".to_string(),
            Value::List(vec![block(vec![
                ("default_rollout_percentage", Value::Int(10)),
                (
                    "exclusion",
                    Value::List(vec![block(vec![(
                        "users",
                        Value::List(vec![Value::String("mallory".to_string())]),
                    )])]),
                ),
            ])]),
        );
        attrs.insert(
            "timewindow_filter".to_string(),
            Value::List(vec![block(vec![
                ("start", Value::String("2024-01-01T00:00:00Z".to_string())),
                (
                    "recurrence",
                    Value::List(vec![block(vec![(
                        "weekly",
                        Value::List(vec![block(vec![
                            ("interval", Value::Int(1)),
                            (
                                "days_of_week",
                                Value::List(vec![Value::String("Friday".to_string())]),
                            ),
                        ])]),
                    )])]),
                ),
            ])]),
        );
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn rejects_unknown_day_of_week() {
        let schema = feature_config().schema;
        let mut attrs = base();
        attrs.insert(
            "timewindow_filter".to_string(),
            Value::List(vec![block(vec![(
                "recurrence",
                Value::List(vec![block(vec![(
                    "weekly",
                    Value::List(vec![block(vec![
                        ("interval", Value::Int(1)),
                        (
                            "days_of_week",
                            Value::List(vec![Value::String("Someday".to_string())]),
                        ),
                    ])]),
                )])]),
            )])]),
        );
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn rejects_out_of_range_rollout() {
        let schema = feature_config().schema;
        let mut attrs = base();
        attrs.insert(
            "targeting_filter".to_string(),
            Value::List(vec![block(vec![(
                "default_rollout_percentage",
                Value::Int(150),
            )])]),
        );
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn rejects_bad_name_and_time() {
        let schema = feature_config().schema;
        let mut attrs = base();
        attrs.insert("name".to_string(), Value::String("a:b".to_string()));
        attrs.insert(
            "timewindow_filter".to_string(),
            Value::List(vec![block(vec![(
                "end",
                Value::String("tomorrow".to_string()),
            )])]),
        );
        assert_eq!(schema.validate(&attrs).unwrap_err().len(), 2);
    }
}
