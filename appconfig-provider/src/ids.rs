//! Resource identifiers
//!
//! ARM IDs for configuration stores and replicas, and the nested item URL
//! used to identify key-values (and therefore feature flags) in a store's
//! data plane.

use std::fmt;

use url::Url;

const PROVIDER_NAMESPACE: &str = "Microsoft.AppConfiguration";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parsing {input:?}: {reason}")]
pub struct IdError {
    pub input: String,
    pub reason: String,
}

impl IdError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Expect `segments[index] == literal` (ASCII case-insensitive) and return the
/// value segment following it.
fn expect_pair<'a>(
    input: &str,
    segments: &[&'a str],
    index: usize,
    literal: &str,
) -> Result<&'a str, IdError> {
    match (segments.get(index), segments.get(index + 1)) {
        (Some(key), Some(value)) if key.eq_ignore_ascii_case(literal) && !value.is_empty() => {
            Ok(value)
        }
        _ => Err(IdError::new(
            input,
            format!("expected segment `{}/{{value}}`", literal),
        )),
    }
}

/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.AppConfiguration/configurationStores/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigurationStoreId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub configuration_store_name: String,
}

impl ConfigurationStoreId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        configuration_store_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            configuration_store_name: configuration_store_name.into(),
        }
    }

    /// Parse an ID, matching the literal segments case-insensitively
    pub fn parse_insensitively(input: &str) -> Result<Self, IdError> {
        let segments: Vec<&str> = input.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() != 8 {
            return Err(IdError::new(
                input,
                "expected a Configuration Store ID with 8 segments",
            ));
        }
        Self::from_segments(input, &segments)
    }

    fn from_segments(input: &str, segments: &[&str]) -> Result<Self, IdError> {
        let subscription_id = expect_pair(input, segments, 0, "subscriptions")?;
        let resource_group_name = expect_pair(input, segments, 2, "resourceGroups")?;
        let namespace = expect_pair(input, segments, 4, "providers")?;
        if !namespace.eq_ignore_ascii_case(PROVIDER_NAMESPACE) {
            return Err(IdError::new(
                input,
                format!("expected provider namespace {}", PROVIDER_NAMESPACE),
            ));
        }
        let name = expect_pair(input, segments, 6, "configurationStores")?;
        Ok(Self::new(subscription_id, resource_group_name, name))
    }

    pub fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/configurationStores/{}",
            self.subscription_id,
            self.resource_group_name,
            PROVIDER_NAMESPACE,
            self.configuration_store_name
        )
    }
}

impl fmt::Display for ConfigurationStoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Configuration Store (Subscription: {:?} / Resource Group Name: {:?} / Configuration Store Name: {:?})",
            self.subscription_id, self.resource_group_name, self.configuration_store_name
        )
    }
}

/// A geo-replica of a configuration store: `{store id}/replicas/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplicaId {
    pub store: ConfigurationStoreId,
    pub replica_name: String,
}

impl ReplicaId {
    pub fn new(store: ConfigurationStoreId, replica_name: impl Into<String>) -> Self {
        Self {
            store,
            replica_name: replica_name.into(),
        }
    }

    pub fn parse_insensitively(input: &str) -> Result<Self, IdError> {
        let segments: Vec<&str> = input.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() != 10 {
            return Err(IdError::new(input, "expected a Replica ID with 10 segments"));
        }
        let store = ConfigurationStoreId::from_segments(input, &segments[..8])?;
        let replica_name = expect_pair(input, &segments, 8, "replicas")?;
        Ok(Self::new(store, replica_name))
    }

    pub fn id(&self) -> String {
        format!("{}/replicas/{}", self.store.id(), self.replica_name)
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Replica (Subscription: {:?} / Resource Group Name: {:?} / Configuration Store Name: {:?} / Replica Name: {:?})",
            self.store.subscription_id,
            self.store.resource_group_name,
            self.store.configuration_store_name,
            self.replica_name
        )
    }
}

/// A key-value inside a configuration store's data plane:
/// `https://{store}.azconfig.io/kv/{key}?label={label}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedItemId {
    pub configuration_store_base_url: String,
    pub key: String,
    pub label: String,
}

impl NestedItemId {
    pub fn new(base_url: &str, key: &str, label: &str) -> Result<Self, IdError> {
        let parsed = Url::parse(base_url).map_err(|e| IdError::new(base_url, e.to_string()))?;
        if parsed.host_str().is_none() {
            return Err(IdError::new(base_url, "expected a URL with a host"));
        }
        if key.is_empty() {
            return Err(IdError::new(base_url, "key must not be empty"));
        }

        Ok(Self {
            configuration_store_base_url: origin(&parsed),
            key: key.to_string(),
            label: label.to_string(),
        })
    }

    pub fn parse(input: &str) -> Result<Self, IdError> {
        let url = Url::parse(input).map_err(|e| IdError::new(input, e.to_string()))?;
        if url.host_str().is_none() {
            return Err(IdError::new(input, "expected a URL with a host"));
        }

        let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
        let encoded_key = match segments.as_slice() {
            ["kv", key] if !key.is_empty() => *key,
            _ => {
                return Err(IdError::new(
                    input,
                    "expected a path in the format `/kv/{key}`",
                ));
            }
        };
        let key = urlencoding::decode(encoded_key)
            .map_err(|e| IdError::new(input, e.to_string()))?
            .into_owned();

        let mut label = None;
        for (name, value) in url.query_pairs() {
            if name != "label" {
                return Err(IdError::new(
                    input,
                    format!("unexpected query parameter {:?}", name),
                ));
            }
            if label.is_some() {
                return Err(IdError::new(input, "`label` was specified more than once"));
            }
            label = Some(value.into_owned());
        }

        Ok(Self {
            configuration_store_base_url: origin(&url),
            key,
            label: label.unwrap_or_default(),
        })
    }

    pub fn id(&self) -> String {
        let mut id = format!(
            "{}/kv/{}",
            self.configuration_store_base_url,
            urlencoding::encode(&self.key)
        );
        if !self.label.is_empty() {
            id.push_str("?label=");
            id.push_str(&urlencoding::encode(&self.label));
        }
        id
    }
}

impl fmt::Display for NestedItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "App Configuration Key {:?} (Label {:?}) in {}",
            self.key, self.label, self.configuration_store_base_url
        )
    }
}

fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}
