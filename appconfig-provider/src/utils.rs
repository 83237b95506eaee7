//! Utility functions for value normalization and conversion

use std::collections::HashMap;

use appconfig_core::resource::Value;

/// Normalize an Azure location (e.g., "West Europe" -> "westeurope")
pub fn normalize_location(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Convert a `tags` attribute into the ARM tag map. Non-string values are
/// skipped.
pub fn expand_tags(tags: Option<&Value>) -> HashMap<String, String> {
    tags.and_then(Value::as_map)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Convert an ARM tag map into a `tags` attribute; `None` when empty
pub fn flatten_tags(tags: &HashMap<String, String>) -> Option<Value> {
    if tags.is_empty() {
        return None;
    }
    Some(Value::Map(
        tags.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    ))
}

/// Lowercase SKU name as written in configuration
pub fn normalize_sku(s: &str) -> String {
    s.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_location() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("eastus2"), "eastus2");
    }

    #[test]
    fn test_tags_round_trip() {
        let value = Value::Map(
            [
                ("env".to_string(), Value::String("prod".to_string())),
                ("count".to_string(), Value::Int(3)),
            ]
            .into_iter()
            .collect(),
        );
        let tags = expand_tags(Some(&value));
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("env").map(String::as_str), Some("prod"));

        let flattened = flatten_tags(&tags).unwrap();
        assert_eq!(
            flattened.as_map().and_then(|m| m.get("env")),
            Some(&Value::String("prod".to_string()))
        );
    }

    #[test]
    fn test_empty_tags() {
        assert!(expand_tags(None).is_empty());
        assert_eq!(flatten_tags(&HashMap::new()), None);
    }
}
