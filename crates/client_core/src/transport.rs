//! Transport capability consumed by the controllers, plus the HTTP implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, Method, RequestBuilder, Response,
};
use shared::{domain::KeyLiteral, error::ApiException};
use tracing::{debug, warn};

use crate::config::ClientSettings;

/// Raw access to one entity set. Implementations own retries and timeouts;
/// callers propagate every error unchanged.
#[async_trait]
pub trait ApiConnection: Send + Sync {
    async fn get(&self, parameters: &str) -> Result<String>;
    async fn get_entity(&self, key_name: &str, identifier: &str, parameters: &str)
        -> Result<String>;
    async fn post(&self, data: &str) -> Result<String>;
    async fn put(&self, key_name: &str, identifier: &str, data: &str) -> Result<bool>;
    async fn delete(&self, key_name: &str, identifier: &str) -> Result<bool>;
    async fn count(&self, parameters: &str) -> Result<usize>;
}

/// Hands out entity-set connections scoped to a session token.
pub trait ApiConnector: Send + Sync {
    fn base_url(&self) -> &str;
    fn connection(&self, endpoint: &str, session_token: &str) -> Arc<dyn ApiConnection>;
}

pub struct HttpApiConnector {
    http: Client,
    settings: ClientSettings,
}

impl HttpApiConnector {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        settings.validate()?;
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }
}

impl ApiConnector for HttpApiConnector {
    fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    /// An empty session token falls back to the configured division.
    fn connection(&self, endpoint: &str, session_token: &str) -> Arc<dyn ApiConnection> {
        let division = if session_token.is_empty() {
            self.settings.division.as_deref().unwrap_or_default()
        } else {
            session_token
        };
        let root = self.settings.base_url.trim_end_matches('/');
        let entity_set_url = if division.is_empty() {
            format!("{root}/api/v1/{}", endpoint.trim_matches('/'))
        } else {
            format!("{root}/api/v1/{division}/{}", endpoint.trim_matches('/'))
        };
        Arc::new(HttpApiConnection {
            http: self.http.clone(),
            entity_set_url,
            access_token: self.settings.access_token.clone(),
        })
    }
}

pub struct HttpApiConnection {
    http: Client,
    entity_set_url: String,
    access_token: Option<String>,
}

impl HttpApiConnection {
    pub fn entity_set_url(&self) -> &str {
        &self.entity_set_url
    }

    fn entity_url(&self, identifier: &str) -> String {
        format!("{}({})", self.entity_set_url, KeyLiteral::parse(identifier))
    }

    fn request(&self, method: Method, url: &str, parameters: &str) -> RequestBuilder {
        let parameters = parameters.trim_start_matches('?');
        let url = if parameters.is_empty() {
            url.to_string()
        } else {
            format!("{url}?{parameters}")
        };
        debug!(%method, %url, "transport: request");
        let builder = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiException::new(status.as_u16(), &body).into())
    }

    /// Remote rejections of writes are reported as `false`; I/O failures stay errors.
    async fn confirmed(response: Response, key_name: &str, identifier: &str) -> Result<bool> {
        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        let body = response.text().await.unwrap_or_default();
        let rejection = ApiException::new(status.as_u16(), &body);
        warn!(key_name, identifier, %rejection, "transport: write rejected");
        Ok(false)
    }
}

#[async_trait]
impl ApiConnection for HttpApiConnection {
    async fn get(&self, parameters: &str) -> Result<String> {
        let response = self
            .request(Method::GET, &self.entity_set_url, parameters)
            .send()
            .await?;
        Ok(Self::ensure_success(response).await?.text().await?)
    }

    async fn get_entity(
        &self,
        _key_name: &str,
        identifier: &str,
        parameters: &str,
    ) -> Result<String> {
        let response = self
            .request(Method::GET, &self.entity_url(identifier), parameters)
            .send()
            .await?;
        Ok(Self::ensure_success(response).await?.text().await?)
    }

    async fn post(&self, data: &str) -> Result<String> {
        let response = self
            .request(Method::POST, &self.entity_set_url, "")
            .header(CONTENT_TYPE, "application/json")
            .body(data.to_string())
            .send()
            .await?;
        Ok(Self::ensure_success(response).await?.text().await?)
    }

    async fn put(&self, key_name: &str, identifier: &str, data: &str) -> Result<bool> {
        let response = self
            .request(Method::PUT, &self.entity_url(identifier), "")
            .header(CONTENT_TYPE, "application/json")
            .body(data.to_string())
            .send()
            .await?;
        Self::confirmed(response, key_name, identifier).await
    }

    async fn delete(&self, key_name: &str, identifier: &str) -> Result<bool> {
        let response = self
            .request(Method::DELETE, &self.entity_url(identifier), "")
            .send()
            .await?;
        Self::confirmed(response, key_name, identifier).await
    }

    async fn count(&self, parameters: &str) -> Result<usize> {
        let url = format!("{}/$count", self.entity_set_url);
        let response = self.request(Method::GET, &url, parameters).send().await?;
        let body = Self::ensure_success(response).await?.text().await?;
        body.trim()
            .parse::<usize>()
            .with_context(|| format!("invalid $count response '{}'", body.trim()))
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
