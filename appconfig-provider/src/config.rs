//! Provider configuration
//!
//! Built from the provider block's attributes, falling back to environment
//! variables for anything not set there.

use std::collections::HashMap;
use std::time::Duration;

use appconfig_core::provider::{ProviderError, ProviderResult};
use appconfig_core::resource::Value;

pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

const ENV_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";
const ENV_ACCESS_TOKEN: &str = "ARM_ACCESS_TOKEN";
const ENV_DATA_PLANE_TOKEN: &str = "APPCONFIG_ACCESS_TOKEN";
const ENV_MANAGEMENT_ENDPOINT: &str = "ARM_ENDPOINT";

/// Handler kinds, each with its own timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

impl Timeouts {
    pub fn for_operation(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// Parse `90s`, `5m` or `1h`; a bare number is seconds
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let (digits, unit) = match input.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => input.split_at(pos),
        None => (input, "s"),
    };
    let amount: u64 = digits.parse().ok()?;
    let seconds = match unit {
        "s" => amount,
        "m" => amount.checked_mul(60)?,
        "h" => amount.checked_mul(3600)?,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub subscription_id: String,
    pub management_endpoint: String,
    /// Bearer token for the management API
    pub access_token: Option<String>,
    /// Bearer token for store data planes; defaults to `access_token`
    pub data_plane_access_token: Option<String>,
    pub timeouts: Timeouts,
    /// Interval between provisioning state polls
    pub poll_interval: Duration,
}

impl ProviderConfig {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            access_token: None,
            data_plane_access_token: None,
            timeouts: Timeouts::default(),
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::from_attributes(&HashMap::new())
    }

    pub fn from_attributes(attributes: &HashMap<String, Value>) -> ProviderResult<Self> {
        Self::from_attributes_with_env(attributes, |key| std::env::var(key).ok())
    }

    /// `env` is consulted for any attribute that is not set
    pub fn from_attributes_with_env(
        attributes: &HashMap<String, Value>,
        env: impl Fn(&str) -> Option<String>,
    ) -> ProviderResult<Self> {
        let get_string = |key: &str, var: &str| -> Option<String> {
            match attributes.get(key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => env(var).filter(|s| !s.is_empty()),
            }
        };

        let subscription_id = get_string("subscription_id", ENV_SUBSCRIPTION_ID).ok_or_else(|| {
            ProviderError::configuration(format!(
                "`subscription_id` must be set in the provider block or via {}",
                ENV_SUBSCRIPTION_ID
            ))
        })?;

        let mut config = Self::new(subscription_id);
        if let Some(endpoint) = get_string("management_endpoint", ENV_MANAGEMENT_ENDPOINT) {
            config.management_endpoint = endpoint;
        }
        config.access_token = get_string("access_token", ENV_ACCESS_TOKEN);
        config.data_plane_access_token = get_string("data_plane_access_token", ENV_DATA_PLANE_TOKEN)
            .or_else(|| config.access_token.clone());

        if let Some(Value::Map(timeouts)) = attributes.get("timeouts") {
            for (name, value) in timeouts {
                let duration = duration_attribute(name, value)?;
                match name.as_str() {
                    "create" => config.timeouts.create = duration,
                    "read" => config.timeouts.read = duration,
                    "update" => config.timeouts.update = duration,
                    "delete" => config.timeouts.delete = duration,
                    other => {
                        return Err(ProviderError::configuration(format!(
                            "unknown timeout {:?}",
                            other
                        )));
                    }
                }
            }
        }

        if let Some(value) = attributes.get("poll_interval") {
            config.poll_interval = duration_attribute("poll_interval", value)?;
        }

        Ok(config)
    }
}

fn duration_attribute(name: &str, value: &Value) -> ProviderResult<Duration> {
    let parsed = match value {
        Value::String(s) => parse_duration(s),
        Value::Int(n) if *n >= 0 => Some(Duration::from_secs(*n as u64)),
        _ => None,
    };
    parsed.ok_or_else(|| {
        ProviderError::configuration(format!(
            "{}: expected a duration such as \"30m\", got {:?}",
            name, value
        ))
    })
}
