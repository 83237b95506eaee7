//! reqwest-backed implementations of the API traits

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::client::{ApiError, ApiResult, DataPlaneApi, ManagementApi};
use crate::ids::{ConfigurationStoreId, ReplicaId};
use crate::models::{
    ConfigurationStore, ConfigurationStoreUpdate, KeyValue, Replica, ResourceListResult,
};

pub const CONFIGURATION_STORES_API_VERSION: &str = "2023-03-01";
const RESOURCES_API_VERSION: &str = "2022-09-01";
const DATA_PLANE_API_VERSION: &str = "1.0";
const KEY_VALUE_CONTENT_TYPE: &str = "application/vnd.microsoft.appconfig.kv+json";
const LIST_PAGE_SIZE: &str = "5";

/// Decode a JSON body, mapping 404 to `ApiError::NotFound`
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

async fn expect_success(response: reqwest::Response) -> ApiResult<()> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }
    if !status.is_success() {
        let body = response.text().await?;
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

fn with_token(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Azure Resource Manager client
pub struct ArmClient {
    client: reqwest::Client,
    base_url: Url,
    subscription_id: String,
    token: Option<String>,
}

impl ArmClient {
    pub fn new(
        base_url: &str,
        subscription_id: impl Into<String>,
        token: Option<String>,
    ) -> ApiResult<Self> {
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            subscription_id: subscription_id.into(),
            token,
        })
    }

    fn url(&self, resource_id: &str, api_version: &str) -> ApiResult<Url> {
        let mut url = self
            .base_url
            .join(resource_id.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", resource_id, e)))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url);
        with_token(self.client.request(method, url), self.token.as_deref())
    }
}

#[async_trait]
impl ManagementApi for ArmClient {
    async fn get_configuration_store(
        &self,
        id: &ConfigurationStoreId,
    ) -> ApiResult<ConfigurationStore> {
        let url = self.url(&id.id(), CONFIGURATION_STORES_API_VERSION)?;
        read_json(self.request(Method::GET, url).send().await?).await
    }

    async fn create_configuration_store(
        &self,
        id: &ConfigurationStoreId,
        store: &ConfigurationStore,
    ) -> ApiResult<ConfigurationStore> {
        let url = self.url(&id.id(), CONFIGURATION_STORES_API_VERSION)?;
        read_json(self.request(Method::PUT, url).json(store).send().await?).await
    }

    async fn update_configuration_store(
        &self,
        id: &ConfigurationStoreId,
        update: &ConfigurationStoreUpdate,
    ) -> ApiResult<ConfigurationStore> {
        let url = self.url(&id.id(), CONFIGURATION_STORES_API_VERSION)?;
        read_json(self.request(Method::PATCH, url).json(update).send().await?).await
    }

    async fn delete_configuration_store(&self, id: &ConfigurationStoreId) -> ApiResult<()> {
        let url = self.url(&id.id(), CONFIGURATION_STORES_API_VERSION)?;
        expect_success(self.request(Method::DELETE, url).send().await?).await
    }

    async fn get_replica(&self, id: &ReplicaId) -> ApiResult<Replica> {
        let url = self.url(&id.id(), CONFIGURATION_STORES_API_VERSION)?;
        read_json(self.request(Method::GET, url).send().await?).await
    }

    async fn create_replica(&self, id: &ReplicaId, replica: &Replica) -> ApiResult<Replica> {
        let url = self.url(&id.id(), CONFIGURATION_STORES_API_VERSION)?;
        read_json(self.request(Method::PUT, url).json(replica).send().await?).await
    }

    async fn delete_replica(&self, id: &ReplicaId) -> ApiResult<()> {
        let url = self.url(&id.id(), CONFIGURATION_STORES_API_VERSION)?;
        expect_success(self.request(Method::DELETE, url).send().await?).await
    }

    async fn list_configuration_store_ids_by_name(&self, name: &str) -> ApiResult<Vec<String>> {
        let filter = format!(
            "resourceType eq 'Microsoft.AppConfiguration/configurationStores' and name eq '{}'",
            name
        );
        let mut url = self.url(
            &format!("/subscriptions/{}/resources", self.subscription_id),
            RESOURCES_API_VERSION,
        )?;
        url.query_pairs_mut()
            .append_pair("$filter", &filter)
            .append_pair("$top", LIST_PAGE_SIZE);

        let mut ids = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next.take() {
            let page: ResourceListResult =
                read_json(self.request(Method::GET, url).send().await?).await?;
            ids.extend(page.value.into_iter().filter_map(|r| r.id));

            if let Some(link) = page.next_link.filter(|l| !l.is_empty()) {
                next = Some(
                    Url::parse(&link)
                        .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", link, e)))?,
                );
            }
        }

        Ok(ids)
    }
}

/// App Configuration data-plane client
pub struct DataPlaneClient {
    client: reqwest::Client,
    token: Option<String>,
}

impl DataPlaneClient {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    fn key_value_url(endpoint: &str, key: &str, label: &str) -> ApiResult<Url> {
        let mut url =
            Url::parse(endpoint).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(endpoint.to_string()))?
            .pop_if_empty()
            .push("kv")
            .push(key);
        {
            let mut query = url.query_pairs_mut();
            if !label.is_empty() {
                query.append_pair("label", label);
            }
            query.append_pair("api-version", DATA_PLANE_API_VERSION);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url);
        with_token(self.client.request(method, url), self.token.as_deref())
    }
}

#[async_trait]
impl DataPlaneApi for DataPlaneClient {
    async fn get_key_value(&self, endpoint: &str, key: &str, label: &str) -> ApiResult<KeyValue> {
        let url = Self::key_value_url(endpoint, key, label)?;
        read_json(self.request(Method::GET, url).send().await?).await
    }

    async fn put_key_value(&self, endpoint: &str, key_value: &KeyValue) -> ApiResult<KeyValue> {
        let label = key_value.label.as_deref().unwrap_or_default();
        let url = Self::key_value_url(endpoint, &key_value.key, label)?;
        let body = json!({
            "value": key_value.value,
            "content_type": key_value.content_type,
            "tags": key_value.tags,
        });
        let response = self
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, KEY_VALUE_CONTENT_TYPE)
            .body(serde_json::to_vec(&body)?)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_key_value(&self, endpoint: &str, key: &str, label: &str) -> ApiResult<()> {
        let url = Self::key_value_url(endpoint, key, label)?;
        expect_success(self.request(Method::DELETE, url).send().await?).await
    }
}
