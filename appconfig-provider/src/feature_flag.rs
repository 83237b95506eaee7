//! app_configuration_feature handlers
//!
//! Feature flags are data-plane key-values. The identifier is the nested item
//! URL of the key (`{endpoint}/kv/{key}?label={label}`), so reads resolve the
//! owning store back from the endpoint through the resolver.

use std::collections::HashMap;

use appconfig_core::provider::{ProviderError, ProviderErrorKind, ProviderResult};
use appconfig_core::resource::{Resource, ResourceId, State, Value};
use log::{debug, info, warn};

use crate::cache::StoreDetails;
use crate::features::{
    ClientFilters, Conditions, DailyRecurrence, FEATURE_CONTENT_TYPE, FeatureFilter,
    FeatureValue, PercentageFilterParameters, TargetingAudience, TargetingExclusion,
    TargetingFilterParameters, TargetingGroup, TimeWindowFilterParameters, TimeWindowRecurrence,
    WeeklyRecurrence, feature_key,
};
use crate::ids::{ConfigurationStoreId, NestedItemId};
use crate::models::KeyValue;
use crate::provider::{AppConfigProvider, api_error, required_string};
use crate::utils::{expand_tags, flatten_tags};

fn validation(id: &ResourceId, message: impl Into<String>) -> ProviderError {
    ProviderError::new(message)
        .with_kind(ProviderErrorKind::Validation)
        .for_resource(id.clone())
}

fn parse_nested_item(id: &ResourceId, identifier: &str) -> ProviderResult<NestedItemId> {
    NestedItemId::parse(identifier).map_err(|e| {
        validation(id, "parsing feature identifier").with_cause(e)
    })
}

impl AppConfigProvider {
    /// Store behind a nested item, or `None` when the store is gone
    async fn store_for_item(
        &self,
        id: &ResourceId,
        nested: &NestedItemId,
    ) -> ProviderResult<Option<StoreDetails>> {
        self.resolver
            .details_from_endpoint(&nested.configuration_store_base_url)
            .await
            .map_err(|e| e.for_resource(id.clone()))
    }

    pub(crate) async fn read_feature(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let nested = parse_nested_item(id, identifier)?;

        let Some(details) = self.store_for_item(id, &nested).await? else {
            info!(
                "unable to determine the configuration store for {} - removing from state",
                nested
            );
            return Ok(State::not_found(id.clone()));
        };

        let kv = match self
            .data_plane
            .get_key_value(&details.data_plane_endpoint, &nested.key, &nested.label)
            .await
        {
            Ok(kv) => kv,
            Err(e) if e.is_not_found() => {
                info!("{} was not found - removing from state", nested);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => return Err(api_error(id, format!("retrieving {}", nested), e)),
        };

        let raw = kv
            .value
            .as_deref()
            .ok_or_else(|| ProviderError::malformed(&nested, "model.value").for_resource(id.clone()))?;
        let feature = FeatureValue::from_json_str(raw).map_err(|e| {
            ProviderError::new(format!("decoding feature value of {}", nested))
                .with_kind(ProviderErrorKind::Decode)
                .with_cause(e)
                .for_resource(id.clone())
        })?;

        let attributes = flatten_feature(&details.configuration_store_id, &kv, &feature);
        Ok(State::existing(id.clone(), attributes).with_identifier(nested.id()))
    }

    pub(crate) async fn create_feature(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let store_id = ConfigurationStoreId::parse_insensitively(&required_string(
            resource,
            "configuration_store_id",
        )?)
        .map_err(|e| validation(id, "parsing `configuration_store_id`").with_cause(e))?;

        let endpoint = self
            .resolver
            .endpoint_for_store(&store_id, None)
            .await
            .map_err(|e| e.for_resource(id.clone()))?
            .ok_or_else(|| {
                ProviderError::not_found(format!("no data-plane endpoint for {}", store_id))
                    .for_resource(id.clone())
            })?;

        let name = required_string(resource, "name")?;
        let key = resource
            .get_string("key")
            .map(str::to_string)
            .unwrap_or_else(|| feature_key(&name));
        let label = resource.get_string("label").unwrap_or_default();
        let nested = NestedItemId::new(&endpoint, &key, label)
            .map_err(|e| validation(id, "building feature identifier").with_cause(e))?;

        match self.data_plane.get_key_value(&endpoint, &key, label).await {
            Ok(_) => return Err(ProviderError::requires_import(&nested.id()).for_resource(id.clone())),
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(api_error(
                    id,
                    format!("checking for presence of existing {}", nested),
                    e,
                ));
            }
        }

        info!("creating {}", nested);
        self.put_feature(id, &endpoint, &nested, resource, None)
            .await?;
        self.read_feature(id, &nested.id()).await
    }

    pub(crate) async fn update_feature(
        &self,
        id: &ResourceId,
        identifier: &str,
        to: &Resource,
    ) -> ProviderResult<State> {
        let nested = parse_nested_item(id, identifier)?;
        let details = self.store_for_item(id, &nested).await?.ok_or_else(|| {
            ProviderError::not_found(format!(
                "unable to determine the configuration store for {}",
                nested
            ))
            .for_resource(id.clone())
        })?;

        let existing = self
            .existing_feature(id, &details.data_plane_endpoint, &nested)
            .await?;

        info!("updating {}", nested);
        self.put_feature(
            id,
            &details.data_plane_endpoint,
            &nested,
            to,
            existing.as_ref(),
        )
        .await?;
        self.read_feature(id, identifier).await
    }

    pub(crate) async fn delete_feature(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let nested = parse_nested_item(id, identifier)?;
        let Some(details) = self.store_for_item(id, &nested).await? else {
            warn!("configuration store for {} is gone, nothing to delete", nested);
            return Ok(());
        };

        info!("deleting {}", nested);
        match self
            .data_plane
            .delete_key_value(&details.data_plane_endpoint, &nested.key, &nested.label)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("{} was already gone", nested);
                Ok(())
            }
            Err(e) => Err(api_error(id, format!("deleting {}", nested), e)),
        }
    }

    /// Current document of a feature, if it exists and decodes
    async fn existing_feature(
        &self,
        id: &ResourceId,
        endpoint: &str,
        nested: &NestedItemId,
    ) -> ProviderResult<Option<FeatureValue>> {
        let kv = match self
            .data_plane
            .get_key_value(endpoint, &nested.key, &nested.label)
            .await
        {
            Ok(kv) => kv,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(api_error(id, format!("retrieving {}", nested), e)),
        };
        let Some(raw) = kv.value.as_deref() else {
            return Ok(None);
        };
        match FeatureValue::from_json_str(raw) {
            Ok(feature) => Ok(Some(feature)),
            Err(e) => {
                warn!("existing value of {} does not decode, overwriting: {}", nested, e);
                Ok(None)
            }
        }
    }

    /// Write the feature document. Fields of `existing` that the resource
    /// does not manage are written back unchanged.
    async fn put_feature(
        &self,
        id: &ResourceId,
        endpoint: &str,
        nested: &NestedItemId,
        resource: &Resource,
        existing: Option<&FeatureValue>,
    ) -> ProviderResult<()> {
        let mut feature = expand_feature(resource)?;
        if let Some(existing) = existing {
            feature.extra = existing.extra.clone();
            feature.conditions.extra = existing.conditions.extra.clone();
        }
        let value = feature.to_json_string().map_err(|e| {
            ProviderError::new("encoding feature value")
                .with_kind(ProviderErrorKind::Decode)
                .with_cause(e)
                .for_resource(id.clone())
        })?;

        let kv = KeyValue {
            key: nested.key.clone(),
            label: (!nested.label.is_empty()).then(|| nested.label.clone()),
            content_type: Some(FEATURE_CONTENT_TYPE.to_string()),
            value: Some(value),
            tags: expand_tags(resource.attributes.get("tags")),
            ..Default::default()
        };
        self.data_plane
            .put_key_value(endpoint, &kv)
            .await
            .map_err(|e| api_error(id, format!("writing {}", nested), e))?;
        Ok(())
    }
}

// =============================================================================
// Expand / flatten
// =============================================================================

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// First element of a single-block list attribute
fn first_map(value: Option<&Value>) -> Option<&HashMap<String, Value>> {
    value
        .and_then(Value::as_list)
        .and_then(|blocks| blocks.first())
        .and_then(Value::as_map)
}

fn int_field(block: &HashMap<String, Value>, name: &str) -> i64 {
    block.get(name).and_then(Value::as_int).unwrap_or_default()
}

fn string_field(block: &HashMap<String, Value>, name: &str) -> Option<String> {
    block.get(name).and_then(Value::as_str).map(str::to_string)
}

fn expand_recurrence(block: &HashMap<String, Value>) -> TimeWindowRecurrence {
    TimeWindowRecurrence {
        daily: first_map(block.get("daily")).map(|daily| DailyRecurrence {
            interval: int_field(daily, "interval"),
        }),
        weekly: first_map(block.get("weekly")).map(|weekly| WeeklyRecurrence {
            interval: int_field(weekly, "interval"),
            first_day_of_week: string_field(weekly, "first_day_of_week").unwrap_or_default(),
            days_of_week: string_list(weekly.get("days_of_week")),
        }),
        end_date: string_field(block, "end_date"),
    }
}

fn expand_filters(resource: &Resource) -> ProviderResult<Vec<FeatureFilter>> {
    let mut filters = Vec::new();

    if let Some(value) = resource.attributes.get("percentage_filter_value") {
        let value = value
            .as_float()
            .ok_or_else(|| validation(&resource.id, "`percentage_filter_value` must be a number"))?;
        filters.push(FeatureFilter::Percentage(PercentageFilterParameters {
            value,
        }));
    }

    if let Some(block) = first_map(resource.attributes.get("targeting_filter")) {
        let groups = block
            .get("groups")
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_map)
            .map(|group| TargetingGroup {
                name: string_field(group, "name").unwrap_or_default(),
                rollout_percentage: int_field(group, "rollout_percentage"),
            })
            .collect();

        filters.push(FeatureFilter::Targeting(TargetingFilterParameters {
            audience: TargetingAudience {
                default_rollout_percentage: int_field(block, "default_rollout_percentage"),
                users: string_list(block.get("users")),
                groups,
                exclusion: first_map(block.get("exclusion")).map(|exclusion| {
                    TargetingExclusion {
                        users: string_list(exclusion.get("users")),
                        groups: string_list(exclusion.get("groups")),
                    }
                }),
            },
        }));
    }

    if let Some(block) = first_map(resource.attributes.get("timewindow_filter")) {
        filters.push(FeatureFilter::TimeWindow(TimeWindowFilterParameters {
            start: string_field(block, "start"),
            end: string_field(block, "end"),
            recurrence: first_map(block.get("recurrence")).map(expand_recurrence),
        }));
    }

    Ok(filters)
}

fn expand_feature(resource: &Resource) -> ProviderResult<FeatureValue> {
    Ok(FeatureValue {
        id: required_string(resource, "name")?,
        description: resource
            .get_string("description")
            .unwrap_or_default()
            .to_string(),
        enabled: resource.get_bool("enabled").unwrap_or(false),
        conditions: Conditions {
            client_filters: ClientFilters(expand_filters(resource)?),
            ..Default::default()
        },
        ..Default::default()
    })
}

fn single_block(block: HashMap<String, Value>) -> Value {
    Value::List(vec![Value::Map(block)])
}

/// Empty lists and strings are left out so they compare equal to an
/// unset attribute
fn insert_strings(block: &mut HashMap<String, Value>, name: &str, items: &[String]) {
    if !items.is_empty() {
        block.insert(
            name.to_string(),
            Value::List(items.iter().cloned().map(Value::String).collect()),
        );
    }
}

fn insert_string(block: &mut HashMap<String, Value>, name: &str, value: Option<&String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        block.insert(name.to_string(), Value::String(value.clone()));
    }
}

fn flatten_recurrence(recurrence: &TimeWindowRecurrence) -> Value {
    let mut block = HashMap::new();
    if let Some(daily) = &recurrence.daily {
        block.insert(
            "daily".to_string(),
            single_block(HashMap::from([(
                "interval".to_string(),
                Value::Int(daily.interval),
            )])),
        );
    }
    if let Some(weekly) = &recurrence.weekly {
        let mut weekly_block =
            HashMap::from([("interval".to_string(), Value::Int(weekly.interval))]);
        insert_string(
            &mut weekly_block,
            "first_day_of_week",
            Some(&weekly.first_day_of_week),
        );
        insert_strings(&mut weekly_block, "days_of_week", &weekly.days_of_week);
        block.insert("weekly".to_string(), single_block(weekly_block));
    }
    insert_string(&mut block, "end_date", recurrence.end_date.as_ref());
    single_block(block)
}

fn flatten_filters(filters: &[FeatureFilter], attributes: &mut HashMap<String, Value>) {
    for filter in filters {
        match filter {
            FeatureFilter::Percentage(p) => {
                attributes.insert("percentage_filter_value".to_string(), Value::Float(p.value));
            }
            FeatureFilter::Targeting(p) => {
                let groups = p
                    .audience
                    .groups
                    .iter()
                    .map(|g| {
                        Value::Map(HashMap::from([
                            ("name".to_string(), Value::String(g.name.clone())),
                            (
                                "rollout_percentage".to_string(),
                                Value::Int(g.rollout_percentage),
                            ),
                        ]))
                    })
                    .collect();
                let mut block = HashMap::from([(
                    "default_rollout_percentage".to_string(),
                    Value::Int(p.audience.default_rollout_percentage),
                )]);
                insert_strings(&mut block, "users", &p.audience.users);
                if !p.audience.groups.is_empty() {
                    block.insert("groups".to_string(), Value::List(groups));
                }
                if let Some(exclusion) = &p.audience.exclusion {
                    let mut exclusion_block = HashMap::new();
                    insert_strings(&mut exclusion_block, "users", &exclusion.users);
                    insert_strings(&mut exclusion_block, "groups", &exclusion.groups);
                    block.insert("exclusion".to_string(), single_block(exclusion_block));
                }
                attributes.insert("targeting_filter".to_string(), single_block(block));
            }
            FeatureFilter::TimeWindow(p) => {
                let mut block = HashMap::new();
                insert_string(&mut block, "start", p.start.as_ref());
                insert_string(&mut block, "end", p.end.as_ref());
                if let Some(recurrence) = &p.recurrence {
                    block.insert("recurrence".to_string(), flatten_recurrence(recurrence));
                }
                attributes.insert("timewindow_filter".to_string(), single_block(block));
            }
        }
    }
}

fn flatten_feature(
    configuration_store_id: &str,
    kv: &KeyValue,
    feature: &FeatureValue,
) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    attributes.insert(
        "configuration_store_id".to_string(),
        Value::String(configuration_store_id.to_string()),
    );
    attributes.insert("name".to_string(), Value::String(feature.id.clone()));
    attributes.insert("key".to_string(), Value::String(kv.key.clone()));
    attributes.insert("enabled".to_string(), Value::Bool(feature.enabled));
    if let Some(label) = kv.label.as_ref().filter(|l| !l.is_empty()) {
        attributes.insert("label".to_string(), Value::String(label.clone()));
    }
    if !feature.description.is_empty() {
        attributes.insert(
            "description".to_string(),
            Value::String(feature.description.clone()),
        );
    }
    if let Some(etag) = &kv.etag {
        attributes.insert("etag".to_string(), Value::String(etag.clone()));
    }
    if let Some(tags) = flatten_tags(&kv.tags) {
        attributes.insert("tags".to_string(), tags);
    }
    flatten_filters(&feature.conditions.client_filters.0, &mut attributes);
    attributes
}
