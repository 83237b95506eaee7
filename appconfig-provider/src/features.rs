//! Feature flag documents and their client filters
//!
//! A feature flag is stored as a key-value under `.appconfig.featureflag/{name}`
//! whose value is a JSON [`FeatureValue`]. Its `conditions.client_filters` is
//! a heterogeneous array discriminated by each element's `name`, decoded into
//! the closed [`FeatureFilter`] enum.
//!
//! Discriminators match case-insensitively and parameter field names are
//! accepted in any casing. Encoding always writes the canonical filter name
//! and PascalCase parameter fields.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PERCENTAGE_FILTER_NAME: &str = "Microsoft.Percentage";
pub const TARGETING_FILTER_NAME: &str = "Microsoft.Targeting";
pub const TIMEWINDOW_FILTER_NAME: &str = "Microsoft.TimeWindow";

pub const FEATURE_KEY_PREFIX: &str = ".appconfig.featureflag/";
pub const FEATURE_CONTENT_TYPE: &str = "application/vnd.microsoft.appconfig.ff+json;charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("client filters must be a JSON array")]
    NotAnArray,
    #[error("client filter {index} is not a JSON object")]
    NotAnObject { index: usize },
    #[error("client filter {index} is missing `name`")]
    MissingName { index: usize },
    #[error("client filter {index} has a non-string `name`")]
    NameNotString { index: usize },
    #[error("client filter {index} repeats parameter {key:?} in different casing")]
    DuplicateKey { index: usize, key: String },
    #[error("unknown filter type {name:?}")]
    UnknownFilter { name: String },
    #[error("decoding parameters of filter {name:?}: {source}")]
    InvalidParameters {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// `null` decodes like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A nested block written either as an object or as a list holding at most
/// one object. `null` and `[]` decode to `None`.
fn optional_block<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(None),
        Value::Array(items) => {
            if items.len() > 1 {
                return Err(de::Error::invalid_length(items.len(), &"at most one block"));
            }
            match items.into_iter().next() {
                Some(item) => item,
                None => return Ok(None),
            }
        }
        other => other,
    };
    serde_json::from_value(value).map(Some).map_err(de::Error::custom)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentageFilterParameters {
    #[serde(
        rename(serialize = "Value", deserialize = "value"),
        deserialize_with = "null_as_default"
    )]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingGroup {
    #[serde(
        rename(serialize = "Name", deserialize = "name"),
        deserialize_with = "null_as_default"
    )]
    pub name: String,
    #[serde(
        rename(serialize = "RolloutPercentage", deserialize = "rolloutpercentage"),
        deserialize_with = "null_as_default"
    )]
    pub rollout_percentage: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingExclusion {
    #[serde(
        rename(serialize = "Users", deserialize = "users"),
        deserialize_with = "null_as_default"
    )]
    pub users: Vec<String>,
    #[serde(
        rename(serialize = "Groups", deserialize = "groups"),
        deserialize_with = "null_as_default"
    )]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingAudience {
    #[serde(
        rename(
            serialize = "DefaultRolloutPercentage",
            deserialize = "defaultrolloutpercentage"
        ),
        deserialize_with = "null_as_default"
    )]
    pub default_rollout_percentage: i64,
    #[serde(
        rename(serialize = "Users", deserialize = "users"),
        deserialize_with = "null_as_default"
    )]
    pub users: Vec<String>,
    #[serde(
        rename(serialize = "Groups", deserialize = "groups"),
        deserialize_with = "null_as_default"
    )]
    pub groups: Vec<TargetingGroup>,
    #[serde(
        rename(serialize = "Exclusion", deserialize = "exclusion"),
        deserialize_with = "optional_block",
        skip_serializing_if = "Option::is_none"
    )]
    pub exclusion: Option<TargetingExclusion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingFilterParameters {
    #[serde(
        rename(serialize = "Audience", deserialize = "audience"),
        deserialize_with = "null_as_default"
    )]
    pub audience: TargetingAudience,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyRecurrence {
    #[serde(
        rename(serialize = "Interval", deserialize = "interval"),
        deserialize_with = "null_as_default"
    )]
    pub interval: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyRecurrence {
    #[serde(
        rename(serialize = "Interval", deserialize = "interval"),
        deserialize_with = "null_as_default"
    )]
    pub interval: i64,
    #[serde(
        rename(serialize = "FirstDayOfWeek", deserialize = "firstdayofweek"),
        alias = "first_day_of_week",
        deserialize_with = "null_as_default"
    )]
    pub first_day_of_week: String,
    #[serde(
        rename(serialize = "DaysOfWeek", deserialize = "daysofweek"),
        alias = "days_of_week",
        deserialize_with = "null_as_default"
    )]
    pub days_of_week: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeWindowRecurrence {
    #[serde(
        rename(serialize = "Daily", deserialize = "daily"),
        deserialize_with = "optional_block",
        skip_serializing_if = "Option::is_none"
    )]
    pub daily: Option<DailyRecurrence>,
    #[serde(
        rename(serialize = "Weekly", deserialize = "weekly"),
        deserialize_with = "optional_block",
        skip_serializing_if = "Option::is_none"
    )]
    pub weekly: Option<WeeklyRecurrence>,
    #[serde(
        rename(serialize = "EndDate", deserialize = "enddate"),
        alias = "end_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeWindowFilterParameters {
    #[serde(
        rename(serialize = "Start", deserialize = "start"),
        skip_serializing_if = "Option::is_none"
    )]
    pub start: Option<String>,
    #[serde(
        rename(serialize = "End", deserialize = "end"),
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<String>,
    #[serde(
        rename(serialize = "Recurrence", deserialize = "recurrence"),
        deserialize_with = "optional_block",
        skip_serializing_if = "Option::is_none"
    )]
    pub recurrence: Option<TimeWindowRecurrence>,
}

/// One client filter of a feature flag
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureFilter {
    Percentage(PercentageFilterParameters),
    Targeting(TargetingFilterParameters),
    TimeWindow(TimeWindowFilterParameters),
}

impl FeatureFilter {
    /// Canonical discriminator written on encode
    pub fn name(&self) -> &'static str {
        match self {
            FeatureFilter::Percentage(_) => PERCENTAGE_FILTER_NAME,
            FeatureFilter::Targeting(_) => TARGETING_FILTER_NAME,
            FeatureFilter::TimeWindow(_) => TIMEWINDOW_FILTER_NAME,
        }
    }

    /// `{"name": ..., "parameters": {...}}`
    pub fn to_json(&self) -> serde_json::Result<Value> {
        let parameters = match self {
            FeatureFilter::Percentage(p) => serde_json::to_value(p)?,
            FeatureFilter::Targeting(p) => serde_json::to_value(p)?,
            FeatureFilter::TimeWindow(p) => serde_json::to_value(p)?,
        };
        let mut object = Map::new();
        object.insert("name".to_string(), Value::String(self.name().to_string()));
        object.insert("parameters".to_string(), parameters);
        Ok(Value::Object(object))
    }
}

type DecodeFn = fn(Value) -> serde_json::Result<FeatureFilter>;

fn parameters<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    serde_json::from_value(value)
}

fn decode_percentage(value: Value) -> serde_json::Result<FeatureFilter> {
    parameters(value).map(FeatureFilter::Percentage)
}

fn decode_targeting(value: Value) -> serde_json::Result<FeatureFilter> {
    parameters(value).map(FeatureFilter::Targeting)
}

fn decode_timewindow(value: Value) -> serde_json::Result<FeatureFilter> {
    parameters(value).map(FeatureFilter::TimeWindow)
}

/// Lowercased discriminator to decoder
static DECODERS: &[(&str, DecodeFn)] = &[
    ("microsoft.percentage", decode_percentage),
    ("microsoft.targeting", decode_targeting),
    ("microsoft.timewindow", decode_timewindow),
];

/// Recursively lowercase object keys so parameters decode in any casing.
/// Returns the offending key when two keys of one object differ only in case.
fn lowercase_keys(value: Value) -> Result<Value, String> {
    match value {
        Value::Object(map) => {
            let mut lowered = Map::with_capacity(map.len());
            for (key, value) in map {
                let folded = key.to_lowercase();
                if lowered.contains_key(&folded) {
                    return Err(key);
                }
                lowered.insert(folded, lowercase_keys(value)?);
            }
            Ok(Value::Object(lowered))
        }
        Value::Array(items) => items
            .into_iter()
            .map(lowercase_keys)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other),
    }
}

fn decode_filter(index: usize, element: &Value) -> Result<FeatureFilter, FilterError> {
    let object = element
        .as_object()
        .ok_or(FilterError::NotAnObject { index })?;
    let name = match object.get("name") {
        None => return Err(FilterError::MissingName { index }),
        Some(Value::String(name)) => name,
        Some(_) => return Err(FilterError::NameNotString { index }),
    };

    let discriminator = name.to_lowercase();
    let decode = DECODERS
        .iter()
        .find(|(key, _)| *key == discriminator)
        .map(|(_, decode)| *decode)
        .ok_or_else(|| FilterError::UnknownFilter { name: name.clone() })?;

    // Absent parameters decode to the variant's defaults
    let params = match object
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("parameters"))
    {
        Some((_, v)) => {
            lowercase_keys(v.clone()).map_err(|key| FilterError::DuplicateKey { index, key })?
        }
        None => Value::Object(Map::new()),
    };

    decode(params).map_err(|source| FilterError::InvalidParameters {
        name: name.clone(),
        source,
    })
}

/// Decode a JSON array of client filters, preserving order. Any invalid
/// element fails the whole array.
pub fn decode_filters(value: &Value) -> Result<Vec<FeatureFilter>, FilterError> {
    let elements = value.as_array().ok_or(FilterError::NotAnArray)?;
    elements
        .iter()
        .enumerate()
        .map(|(index, element)| decode_filter(index, element))
        .collect()
}

pub fn encode_filters(filters: &[FeatureFilter]) -> serde_json::Result<Value> {
    filters
        .iter()
        .map(FeatureFilter::to_json)
        .collect::<serde_json::Result<Vec<_>>>()
        .map(Value::Array)
}

/// The `client_filters` array as it appears inside a feature document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientFilters(pub Vec<FeatureFilter>);

impl Serialize for ClientFilters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for filter in &self.0 {
            seq.serialize_element(&SerializedFilter(filter))?;
        }
        seq.end()
    }
}

struct SerializedFilter<'a>(&'a FeatureFilter);

impl Serialize for SerializedFilter<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("name", self.0.name())?;
        match self.0 {
            FeatureFilter::Percentage(p) => map.serialize_entry("parameters", p)?,
            FeatureFilter::Targeting(p) => map.serialize_entry("parameters", p)?,
            FeatureFilter::TimeWindow(p) => map.serialize_entry("parameters", p)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ClientFilters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(ClientFilters::default());
        }
        decode_filters(&value)
            .map(ClientFilters)
            .map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default)]
    pub client_filters: ClientFilters,
    /// Fields not managed here, such as `requirement_type`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Value of a `.appconfig.featureflag/{name}` key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureValue {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conditions: Conditions,
    /// Fields not managed here (`variants`, `allocation`, `telemetry`),
    /// written back unchanged on update
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureValue {
    pub fn from_json_str(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Data-plane key of the feature named `name`
pub fn feature_key(name: &str) -> String {
    format!("{}{}", FEATURE_KEY_PREFIX, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn percentage_example() {
        let input = json!([{"name": "Microsoft.Percentage", "parameters": {"Value": 50}}]);
        let filters = decode_filters(&input).unwrap();
        assert_eq!(
            filters,
            vec![FeatureFilter::Percentage(PercentageFilterParameters {
                value: 50.0
            })]
        );

        let encoded = encode_filters(&filters).unwrap();
        assert_eq!(encoded[0]["name"], "Microsoft.Percentage");
        assert_eq!(encoded[0]["parameters"]["Value"].as_f64(), Some(50.0));
        assert_eq!(decode_filters(&encoded).unwrap(), filters);
    }

    #[test]
    fn targeting_round_trip() {
        let input = json!([{
            "name": "Microsoft.Targeting",
            "parameters": {
                "Audience": {
                    "DefaultRolloutPercentage": 20,
                    "Users": ["alice", "bob"],
                    "Groups": [{"Name": "beta", "RolloutPercentage": 75}],
                    "Exclusion": {"Users": ["mallory"], "Groups": []}
                }
            }
        }]);
        let filters = decode_filters(&input).unwrap();
        let FeatureFilter::Targeting(params) = &filters[0] else {
            panic!("expected targeting filter, got {:?}", filters[0]);
        };
        assert_eq!(params.audience.default_rollout_percentage, 20);
        assert_eq!(params.audience.users, vec!["alice", "bob"]);
        assert_eq!(params.audience.groups[0].name, "beta");
        assert_eq!(params.audience.groups[0].rollout_percentage, 75);
        assert_eq!(
            params.audience.exclusion.as_ref().unwrap().users,
            vec!["mallory"]
        );

        let encoded = encode_filters(&filters).unwrap();
        assert_eq!(encoded, input);
    }

    #[test]
    fn timewindow_round_trip() {
        let input = json!([{
            "name": "Microsoft.TimeWindow",
            "parameters": {
                "Start": "2024-01-01T00:00:00Z",
                "End": "2024-02-01T00:00:00Z"
            }
        }]);
        let filters = decode_filters(&input).unwrap();
        assert_eq!(
            filters,
            vec![FeatureFilter::TimeWindow(TimeWindowFilterParameters {
                start: Some("2024-01-01T00:00:00Z".to_string()),
                end: Some("2024-02-01T00:00:00Z".to_string()),
                recurrence: None,
            })]
        );
        assert_eq!(encode_filters(&filters).unwrap(), input);
    }

    #[test]
    fn timewindow_recurrence() {
        let input = json!([{
            "name": "microsoft.timewindow",
            "parameters": {
                "start": "2024-01-01T00:00:00Z",
                "recurrence": {"weekly": {"interval": 2, "first_day_of_week": "Monday", "DaysOfWeek": ["Friday"]}}
            }
        }]);
        let filters = decode_filters(&input).unwrap();
        let FeatureFilter::TimeWindow(params) = &filters[0] else {
            panic!("expected time window filter");
        };
        let weekly = params
            .recurrence
            .as_ref()
            .and_then(|r| r.weekly.as_ref())
            .unwrap();
        assert_eq!(weekly.interval, 2);
        assert_eq!(weekly.days_of_week, vec!["Friday"]);
        assert_eq!(weekly.first_day_of_week, "Monday");
    }

    #[test]
    fn order_is_preserved() {
        let input = json!([
            {"name": "Microsoft.TimeWindow", "parameters": {}},
            {"name": "Microsoft.Percentage", "parameters": {"Value": 10}},
            {"name": "Microsoft.Targeting", "parameters": {}},
        ]);
        let names: Vec<_> = decode_filters(&input)
            .unwrap()
            .iter()
            .map(FeatureFilter::name)
            .collect();
        assert_eq!(
            names,
            vec![
                TIMEWINDOW_FILTER_NAME,
                PERCENTAGE_FILTER_NAME,
                TARGETING_FILTER_NAME
            ]
        );
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let err = decode_filters(&json!([{"name": "Microsoft.Unknown", "parameters": {}}]))
            .unwrap_err();
        assert!(
            matches!(&err, FilterError::UnknownFilter { name } if name == "Microsoft.Unknown")
        );
        assert!(err.to_string().contains("Microsoft.Unknown"));
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = decode_filters(&json!([{"parameters": {}}])).unwrap_err();
        assert!(matches!(err, FilterError::MissingName { index: 0 }));
    }

    #[test]
    fn malformed_elements_are_rejected() {
        assert!(matches!(
            decode_filters(&json!({"name": "Microsoft.Percentage"})),
            Err(FilterError::NotAnArray)
        ));
        assert!(matches!(
            decode_filters(&json!([{"name": "Microsoft.Percentage"}, "oops"])),
            Err(FilterError::NotAnObject { index: 1 })
        ));
        assert!(matches!(
            decode_filters(&json!([{"name": 7}])),
            Err(FilterError::NameNotString { index: 0 })
        ));
        assert!(matches!(
            decode_filters(&json!([{"name": "Microsoft.Percentage", "parameters": {"Value": "half"}}])),
            Err(FilterError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn discriminator_is_case_insensitive() {
        let lower = decode_filters(&json!([{
            "name": "microsoft.targeting",
            "parameters": {"audience": {"defaultrolloutpercentage": 5}}
        }]))
        .unwrap();
        let canonical = decode_filters(&json!([{
            "name": "Microsoft.Targeting",
            "parameters": {"Audience": {"DefaultRolloutPercentage": 5}}
        }]))
        .unwrap();
        assert_eq!(lower, canonical);
        assert_eq!(encode_filters(&lower).unwrap()[0]["name"], "Microsoft.Targeting");
    }

    #[test]
    fn feature_value_document() {
        let raw = r#"{
            "id": "beta",
            "description": "beta rollout",
            "enabled": true,
            "conditions": {
                "client_filters": [
                    {"name": "Microsoft.Percentage", "parameters": {"Value": 25}}
                ]
            }
        }"#;
        let value = FeatureValue::from_json_str(raw).unwrap();
        assert_eq!(value.id, "beta");
        assert!(value.enabled);
        assert_eq!(
            value.conditions.client_filters.0,
            vec![FeatureFilter::Percentage(PercentageFilterParameters {
                value: 25.0
            })]
        );

        let reparsed = FeatureValue::from_json_str(&value.to_json_string().unwrap()).unwrap();
        assert_eq!(reparsed, value);
    }

    #[test]
    fn feature_value_without_filters() {
        let value =
            FeatureValue::from_json_str(r#"{"id":"beta","conditions":{"client_filters":null}}"#)
                .unwrap();
        assert!(value.conditions.client_filters.0.is_empty());
        assert!(!value.enabled);
    }

    #[test]
    fn invalid_filter_fails_document() {
        let err = FeatureValue::from_json_str(
            r#"{"id":"beta","conditions":{"client_filters":[{"name":"Custom.Thing"}]}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Custom.Thing"));
    }

    #[test]
    fn null_parameters_decode_as_empty() {
        let filters = decode_filters(&json!([
            {
                "name": "Microsoft.Targeting",
                "parameters": {
                    "Audience": {
                        "DefaultRolloutPercentage": 50,
                        "Users": null,
                        "Groups": null,
                        "Exclusion": null
                    }
                }
            },
            {"name": "Microsoft.Percentage", "parameters": {"Value": null}},
        ]))
        .unwrap();
        let FeatureFilter::Targeting(params) = &filters[0] else {
            panic!("expected targeting filter, got {:?}", filters[0]);
        };
        assert_eq!(params.audience.default_rollout_percentage, 50);
        assert!(params.audience.users.is_empty());
        assert!(params.audience.groups.is_empty());
        assert_eq!(params.audience.exclusion, None);
        assert_eq!(
            filters[1],
            FeatureFilter::Percentage(PercentageFilterParameters { value: 0.0 })
        );
    }

    #[test]
    fn blocks_written_as_lists_decode() {
        let filters = decode_filters(&json!([
            {
                "name": "Microsoft.Targeting",
                "parameters": {
                    "Audience": {
                        "DefaultRolloutPercentage": 10,
                        "Exclusion": [{"Users": ["mallory"], "Groups": null}]
                    }
                }
            },
            {
                "name": "Microsoft.TimeWindow",
                "parameters": {
                    "Start": "2024-01-01T00:00:00Z",
                    "End": "",
                    "Recurrence": [{
                        "Daily": [{"interval": 3}],
                        "Weekly": null,
                        "EndDate": "2024-06-01T00:00:00Z"
                    }]
                }
            },
        ]))
        .unwrap();

        let FeatureFilter::Targeting(targeting) = &filters[0] else {
            panic!("expected targeting filter, got {:?}", filters[0]);
        };
        assert_eq!(
            targeting.audience.exclusion,
            Some(TargetingExclusion {
                users: vec!["mallory".to_string()],
                groups: vec![],
            })
        );

        let FeatureFilter::TimeWindow(window) = &filters[1] else {
            panic!("expected time window filter, got {:?}", filters[1]);
        };
        let recurrence = window.recurrence.as_ref().unwrap();
        assert_eq!(recurrence.daily, Some(DailyRecurrence { interval: 3 }));
        assert_eq!(recurrence.weekly, None);
        assert_eq!(recurrence.end_date.as_deref(), Some("2024-06-01T00:00:00Z"));

        // Encoding writes the object form
        let encoded = encode_filters(&filters).unwrap();
        assert_eq!(
            encoded[0]["parameters"]["Audience"]["Exclusion"]["Users"][0],
            "mallory"
        );
        assert_eq!(
            encoded[1]["parameters"]["Recurrence"]["Daily"]["Interval"],
            3
        );
        assert_eq!(decode_filters(&encoded).unwrap(), filters);
    }

    #[test]
    fn more_than_one_block_is_rejected() {
        let err = decode_filters(&json!([{
            "name": "Microsoft.Targeting",
            "parameters": {"Audience": {"Exclusion": [{"Users": ["a"]}, {"Users": ["b"]}]}}
        }]))
        .unwrap_err();
        assert!(matches!(err, FilterError::InvalidParameters { .. }));
    }

    #[test]
    fn keys_differing_only_in_case_are_rejected() {
        let err = decode_filters(&json!([
            {"name": "Microsoft.Percentage", "parameters": {"Value": 10}},
            {"name": "Microsoft.Percentage", "parameters": {"Value": 1, "value": 2}},
        ]))
        .unwrap_err();
        assert!(matches!(&err, FilterError::DuplicateKey { index: 1, .. }));
    }

    #[test]
    fn unmanaged_document_fields_are_kept() {
        let raw = r#"{
            "id": "beta",
            "description": null,
            "enabled": true,
            "conditions": {"client_filters": [], "requirement_type": "All"},
            "variants": [{"name": "on", "configuration_value": true}],
            "allocation": {"default_when_enabled": "on", "seed": "abc"}
        }"#;
        let value = FeatureValue::from_json_str(raw).unwrap();
        assert_eq!(value.description, "");
        assert_eq!(value.conditions.extra["requirement_type"], "All");
        assert_eq!(value.extra["allocation"]["seed"], "abc");

        let written: Value = serde_json::from_str(&value.to_json_string().unwrap()).unwrap();
        assert_eq!(written["variants"][0]["name"], "on");
        assert_eq!(written["conditions"]["requirement_type"], "All");
        assert_eq!(FeatureValue::from_json_str(&written.to_string()).unwrap(), value);
    }

    #[test]
    fn feature_key_has_prefix() {
        assert_eq!(feature_key("beta"), ".appconfig.featureflag/beta");
    }
}
