//! REST implementations of the engine's collaborator traits.

use async_trait::async_trait;
use polisa_core::{
    ApprovalResponse, ChunkResponse, ImportFile, ImportSessionId, NetworkError, PoolRecordId,
    Record, SeriesQuery, SeriesResponse, UploadResponse, ValidationError,
};
use polisa_engine::{ImportGateway, PoolGateway, SeriesSource};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{AuthConfig, ConsoleConfig};
use crate::error::ClientError;
use crate::normalize::FieldMapping;
use crate::wire::{
    self, RawApprovalResponse, RawChunkResponse, RawSeriesResponse, RawUploadResponse,
};

pub const SERIES_PATH: &str = "/api/dashboard/series";
pub const IMPORT_UPLOAD_PATH: &str = "/api/imports/upload";
pub const POOL_BATCH_APPROVE_PATH: &str = "/api/pool/batch-approve";

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl RestClient {
    pub fn new(config: &ConsoleConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let auth_header = build_auth_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch a list endpoint and map its entries through `mapping`.
    ///
    /// The list may arrive bare or wrapped as `{"data": [...]}`. Entries
    /// that cannot be mapped come back separately so the page can show them.
    pub async fn fetch_records(
        &self,
        path: &str,
        mapping: &FieldMapping,
    ) -> Result<(Vec<Record>, Vec<ValidationError>), NetworkError> {
        let body = self.fetch_body(path, self.client.get(self.url(path))).await?;
        mapping
            .decode_list(&body)
            .map_err(|err| NetworkError::Decode {
                endpoint: path.to_string(),
                reason: err.to_string(),
            })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `request` and return the body of a successful response.
    async fn fetch_body(&self, endpoint: &str, request: RequestBuilder) -> Result<String, NetworkError> {
        let transport = |err: reqwest::Error| NetworkError::Transport {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        };
        let response = request
            .headers(self.auth_header.clone())
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if !status.is_success() {
            let message = wire::error_message(&body);
            tracing::warn!(endpoint, status = status.as_u16(), %message, "request rejected");
            return Err(NetworkError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    /// Send `request` and decode the body as `R`, converted into `T`.
    async fn send<R, T>(&self, endpoint: &str, request: RequestBuilder) -> Result<T, NetworkError>
    where
        R: DeserializeOwned + Into<T>,
    {
        let body = self.fetch_body(endpoint, request).await?;
        wire::decode::<R, T>(&body).map_err(|err| NetworkError::Decode {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        })
    }
}

/// Query-string pairs for a series request. Each id list is sent as one
/// comma-joined parameter in name order.
pub fn series_params(query: &SeriesQuery) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), query.mode.clone()),
        ("granularity".to_string(), query.granularity.as_str().to_string()),
        (
            "startDate".to_string(),
            query.range.start().format("%Y-%m-%d").to_string(),
        ),
        (
            "endDate".to_string(),
            query.range.end().format("%Y-%m-%d").to_string(),
        ),
    ];
    for (name, ids) in query.filters.normalized().lists() {
        if ids.is_empty() {
            continue;
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        params.push((name.to_string(), joined));
    }
    params
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkParams {
    skip: u64,
    take: u64,
}

#[derive(Serialize)]
struct BatchApproveBody<'a> {
    ids: &'a [PoolRecordId],
}

#[async_trait]
impl SeriesSource for RestClient {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<SeriesResponse, NetworkError> {
        let request = self
            .client
            .get(self.url(SERIES_PATH))
            .query(&series_params(query));
        self.send::<RawSeriesResponse, _>(SERIES_PATH, request).await
    }
}

#[async_trait]
impl ImportGateway for RestClient {
    async fn upload(
        &self,
        file: &ImportFile,
        company_id_hint: Option<i64>,
    ) -> Result<UploadResponse, NetworkError> {
        let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        let mut form = Form::new().part("file", part);
        if let Some(company_id) = company_id_hint {
            form = form.text("companyId", company_id.to_string());
        }
        let request = self
            .client
            .post(self.url(IMPORT_UPLOAD_PATH))
            .multipart(form);
        self.send::<RawUploadResponse, _>(IMPORT_UPLOAD_PATH, request)
            .await
    }

    async fn confirm_chunk(
        &self,
        session_id: &ImportSessionId,
        skip: u64,
        take: u64,
    ) -> Result<ChunkResponse, NetworkError> {
        let path = format!("/api/imports/{}/confirm", session_id);
        let request = self
            .client
            .post(self.url(&path))
            .query(&ChunkParams { skip, take });
        self.send::<RawChunkResponse, _>(&path, request).await
    }
}

#[async_trait]
impl PoolGateway for RestClient {
    async fn approve(&self, id: &PoolRecordId) -> Result<ApprovalResponse, NetworkError> {
        let path = format!("/api/pool/{}/approve", id);
        let request = self.client.post(self.url(&path));
        self.send::<RawApprovalResponse, _>(&path, request).await
    }

    async fn batch_approve(&self, ids: &[PoolRecordId]) -> Result<ApprovalResponse, NetworkError> {
        let request = self
            .client
            .post(self.url(POOL_BATCH_APPROVE_PATH))
            .json(&BatchApproveBody { ids });
        self.send::<RawApprovalResponse, _>(POOL_BATCH_APPROVE_PATH, request)
            .await
    }
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = auth.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key.trim())?,
        );
    }
    if let Some(token) = auth.bearer_token.as_deref().filter(|t| !t.trim().is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))?;
        value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, value);
    }
    Ok(headers)
}
