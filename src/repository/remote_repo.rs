//! HTTP Template Store
//!
//! REST client for the remote template service.
//!
//! Routes:
//! - `GET    {base}/templates?user_id=&page=&page_size=`
//! - `POST   {base}/templates`
//! - `PATCH  {base}/templates/{id}` / `DELETE {base}/templates/{id}`
//! - `GET    {base}/templates/{id}/items`
//! - `POST   {base}/template-items`
//! - `PATCH  {base}/template-items/{id}` / `DELETE {base}/template-items/{id}`

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::traits::RemoteTemplateStore;
use crate::config::AppConfig;
use crate::domain::{
    DomainError, DomainResult, ItemPatch, ItemRecord, NewItem, NewTemplate, RemoteError,
    RemoteErrorKind, RemoteResult, TemplatePatch, TemplateRecord,
};

/// List responses come either bare or wrapped in `{ "data": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Wrapped { data } => data,
            ListEnvelope::Bare(items) => items,
        }
    }
}

/// Single-record responses, bare or wrapped
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> RecordEnvelope<T> {
    fn into_inner(self) -> T {
        match self {
            RecordEnvelope::Wrapped { data } => data,
            RecordEnvelope::Bare(record) => record,
        }
    }
}

/// Non-2xx response; throttling, request timeouts and server errors are
/// worth retrying
pub fn status_error(kind: RemoteErrorKind, status: u16, body: &str) -> RemoteError {
    let message = format!("Request failed with status {}: {}", status, body.trim());
    if status >= 500 || status == 429 || status == 408 {
        RemoteError::retryable(kind, message)
    } else {
        RemoteError::fatal(kind, message)
    }
}

fn transport_error(kind: RemoteErrorKind, e: reqwest::Error) -> RemoteError {
    let message = format!("Failed to send request: {}", e);
    if e.is_timeout() || e.is_connect() {
        RemoteError::retryable(kind, message)
    } else {
        RemoteError::fatal(kind, message)
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string()
}

/// reqwest-backed remote template store
pub struct HttpTemplateStore {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTemplateStore {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> DomainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(http, base_url, token))
    }

    /// Use an already configured client (shared pools, proxies, timeouts)
    pub fn with_client(http: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn from_config(config: &AppConfig) -> DomainResult<Self> {
        if config.api_base_url.trim().is_empty() {
            return Err(DomainError::Config("api_base_url is not set".to_string()));
        }
        Self::new(
            &config.api_base_url,
            config.api_token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn template_url(&self, id: &str) -> String {
        self.url(&format!("templates/{}", encode_segment(id)))
    }

    fn item_url(&self, id: &str) -> String {
        self.url(&format!("template-items/{}", encode_segment(id)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        kind: RemoteErrorKind,
    ) -> RemoteResult<reqwest::Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| transport_error(kind, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(kind, status.as_u16(), &body));
        }
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        kind: RemoteErrorKind,
    ) -> RemoteResult<T> {
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(kind, e))?;
        serde_json::from_str(&body).map_err(|e| {
            RemoteError::fatal(kind, format!("Failed to parse response: {} - {}", e, body))
        })
    }
}

#[async_trait]
impl RemoteTemplateStore for HttpTemplateStore {
    async fn list_templates_by_user(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> RemoteResult<Vec<TemplateRecord>> {
        let kind = RemoteErrorKind::ListFailed;
        let request = self.http.get(self.url("templates")).query(&[
            ("user_id", user_id.to_string()),
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ]);
        let response = self.send(request, kind).await?;
        let envelope: ListEnvelope<TemplateRecord> = Self::read_json(response, kind).await?;
        Ok(envelope.into_vec())
    }

    async fn create_template(&self, template: &NewTemplate) -> RemoteResult<TemplateRecord> {
        let kind = RemoteErrorKind::CreateFailed;
        let request = self.http.post(self.url("templates")).json(template);
        let response = self.send(request, kind).await?;
        let envelope: RecordEnvelope<TemplateRecord> = Self::read_json(response, kind).await?;
        Ok(envelope.into_inner())
    }

    async fn update_template(&self, id: &str, patch: &TemplatePatch) -> RemoteResult<()> {
        let request = self.http.patch(self.template_url(id)).json(patch);
        self.send(request, RemoteErrorKind::UpdateFailed).await?;
        Ok(())
    }

    async fn delete_template(&self, id: &str) -> RemoteResult<()> {
        let request = self.http.delete(self.template_url(id));
        self.send(request, RemoteErrorKind::DeleteFailed).await?;
        Ok(())
    }

    async fn list_items_by_template(&self, template_id: &str) -> RemoteResult<Vec<ItemRecord>> {
        let kind = RemoteErrorKind::ListFailed;
        let url = format!("{}/items", self.template_url(template_id));
        let response = self.send(self.http.get(url), kind).await?;
        let envelope: ListEnvelope<ItemRecord> = Self::read_json(response, kind).await?;
        Ok(envelope.into_vec())
    }

    async fn create_item(&self, item: &NewItem) -> RemoteResult<ItemRecord> {
        let kind = RemoteErrorKind::CreateFailed;
        let request = self.http.post(self.url("template-items")).json(item);
        let response = self.send(request, kind).await?;
        let envelope: RecordEnvelope<ItemRecord> = Self::read_json(response, kind).await?;
        Ok(envelope.into_inner())
    }

    async fn update_item(&self, id: &str, patch: &ItemPatch) -> RemoteResult<()> {
        let request = self.http.patch(self.item_url(id)).json(patch);
        self.send(request, RemoteErrorKind::UpdateFailed).await?;
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> RemoteResult<()> {
        let request = self.http.delete(self.item_url(id));
        self.send(request, RemoteErrorKind::DeleteFailed).await?;
        Ok(())
    }
}
