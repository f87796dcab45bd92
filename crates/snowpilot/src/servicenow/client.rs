use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::query::QueryOptions;
use super::result::{normalize_response, RemoteCallResult};
use super::store::RecordStore;
use crate::config::ServiceNowConfig;
use crate::errors::{SnowError, SnowResult};

/// Per-call timeout for Table API requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An authenticated session against one ServiceNow instance.
///
/// Each agent owns its own client; the underlying connection pool is reused
/// across the sequential calls of a conversation.
pub struct ServiceNowClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl ServiceNowClient {
    pub fn new(config: &ServiceNowConfig) -> SnowResult<Self> {
        let base_url = match &config.base_url {
            Some(base_url) => base_url.clone(),
            None => instance_url(&config.instance)?,
        };
        Self::with_base_url(base_url, &config.username, &config.password)
    }

    /// Connect to an explicit base URL instead of `https://{instance}.service-now.com`
    pub fn with_base_url<S: AsRef<str>>(
        base_url: S,
        username: &str,
        password: &str,
    ) -> SnowResult<Self> {
        let base_url = base_url.as_ref().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|_| SnowError::InvalidInstance(base_url.clone()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/api/now/table/{}", self.base_url, table)
    }

    fn record_url(&self, table: &str, sys_id: &str) -> String {
        format!("{}/{}", self.table_url(table), sys_id)
    }

    async fn send(&self, request: RequestBuilder) -> SnowResult<RemoteCallResult> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        let result = normalize_response(status, &body);
        if let Some(error) = result.error() {
            debug!(status, error, "ServiceNow returned an error response");
        }
        Ok(result)
    }
}

#[async_trait]
impl RecordStore for ServiceNowClient {
    fn username(&self) -> &str {
        &self.username
    }

    async fn query(&self, table: &str, options: &QueryOptions) -> SnowResult<RemoteCallResult> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&options.to_params());
        self.send(request).await
    }

    async fn get(
        &self,
        table: &str,
        sys_id: &str,
        fields: &[String],
        display_value: bool,
    ) -> SnowResult<RemoteCallResult> {
        let mut params = Vec::new();
        if !fields.is_empty() {
            params.push(("sysparm_fields", fields.join(",")));
        }
        if display_value {
            params.push(("sysparm_display_value", "true".to_string()));
        }
        let request = self
            .client
            .get(self.record_url(table, sys_id))
            .query(&params);
        self.send(request).await
    }

    async fn create(
        &self,
        table: &str,
        data: &Value,
        input_display_value: bool,
    ) -> SnowResult<RemoteCallResult> {
        let request = self
            .client
            .post(self.table_url(table))
            .query(&write_params(input_display_value))
            .json(data);
        self.send(request).await
    }

    async fn update(
        &self,
        table: &str,
        sys_id: &str,
        data: &Value,
        input_display_value: bool,
    ) -> SnowResult<RemoteCallResult> {
        let request = self
            .client
            .patch(self.record_url(table, sys_id))
            .query(&write_params(input_display_value))
            .json(data);
        self.send(request).await
    }

    async fn delete(&self, table: &str, sys_id: &str) -> SnowResult<RemoteCallResult> {
        let request = self.client.delete(self.record_url(table, sys_id));
        self.send(request).await
    }
}

fn write_params(input_display_value: bool) -> Vec<(&'static str, &'static str)> {
    if input_display_value {
        vec![("sysparm_input_display_value", "true")]
    } else {
        Vec::new()
    }
}

/// Reduce whatever the user configured to the bare instance name,
/// e.g. `https://dev1234.service-now.com/` becomes `dev1234`
pub fn normalize_instance(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme
        .split(".service-now.com")
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string()
}

fn instance_url(raw: &str) -> SnowResult<String> {
    let instance = normalize_instance(raw);
    let valid = !instance.is_empty()
        && instance
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(SnowError::InvalidInstance(raw.to_string()));
    }
    Ok(format!("https://{}.service-now.com", instance))
}
