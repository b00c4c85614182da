//! HTTP access to the aggregation backend.

use std::{marker::PhantomData, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{ApiAction, FeedItem},
    error::ApiError,
    protocol::{
        AckResponse, ErrorBody, ExportResponse, FetchRequest, FetchResponse, ListResponse,
        StatsResponse, TaskStatusResponse,
    },
};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// One category's slice of the REST contract.
#[async_trait]
pub trait FeedApi<T: FeedItem>: Send + Sync {
    async fn list(&self) -> Result<ListResponse<T>>;
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse<T>>;
    async fn clear(&self) -> Result<AckResponse>;
    async fn stats(&self) -> Result<StatsResponse>;
    async fn export(&self) -> Result<ExportResponse<T>>;
    /// `Ok(None)` when the backend has no task-status endpoint.
    async fn task_status(&self, task_id: &str) -> Result<Option<TaskStatusResponse>>;
}

/// Shared HTTP client and server root; hands out per-category feed clients.
#[derive(Debug, Clone)]
pub struct ApiConnection {
    http: Client,
    base_url: Url,
}

impl ApiConnection {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::HttpSetup)?;
        Self::with_client(http, server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: normalize_base_url(server_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn feed<T: FeedItem>(&self) -> HttpFeedClient<T> {
        HttpFeedClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            _item: PhantomData,
        }
    }
}

/// Joining relative paths only keeps the base path when it ends with `/`.
fn normalize_base_url(server_url: &str) -> Result<Url> {
    let trimmed = server_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| ClientError::InvalidUrl {
        url: server_url.to_string(),
        source,
    })
}

pub struct HttpFeedClient<T> {
    http: Client,
    base_url: Url,
    _item: PhantomData<fn() -> T>,
}

impl<T: FeedItem> HttpFeedClient<T> {
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let url = self.endpoint(path)?;
        debug!(category = %T::CATEGORY, %url, "GET");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| transport_error(&url, source))?;
        read_json(&url, response).await
    }

    async fn post<B: Serialize + ?Sized + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = self.endpoint(path)?;
        debug!(category = %T::CATEGORY, %url, "POST");
        let response = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|source| transport_error(&url, source))?;
        read_json(&url, response).await
    }
}

fn transport_error(url: &Url, source: reqwest::Error) -> ClientError {
    ClientError::Transport {
        endpoint: url.path().to_string(),
        source,
    }
}

async fn read_json<R: DeserializeOwned>(url: &Url, response: Response) -> Result<R> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|source| transport_error(url, source))?;

    if !status.is_success() {
        let error_body: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();
        return Err(ClientError::Api {
            endpoint: url.path().to_string(),
            source: ApiError::from_status(status.as_u16(), error_body.message).into(),
        });
    }

    serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
        endpoint: url.path().to_string(),
        source,
    })
}

fn rejected(message: &str, fallback: &str) -> ClientError {
    if message.trim().is_empty() {
        ClientError::Rejected(fallback.to_string())
    } else {
        ClientError::Rejected(message.to_string())
    }
}

#[async_trait]
impl<T: FeedItem> FeedApi<T> for HttpFeedClient<T> {
    async fn list(&self) -> Result<ListResponse<T>> {
        let response: ListResponse<T> = self.get(&T::CATEGORY.list_path()).await?;
        if !response.success {
            return Err(rejected("", "backend rejected the list request"));
        }
        Ok(response)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse<T>> {
        let response: FetchResponse<T> = self
            .post(&T::CATEGORY.action_path(ApiAction::Fetch), request)
            .await?;
        if !response.success {
            return Err(rejected(&response.message, "backend rejected the fetch request"));
        }
        Ok(response)
    }

    async fn clear(&self) -> Result<AckResponse> {
        let response: AckResponse = self
            .post(
                &T::CATEGORY.action_path(ApiAction::Clear),
                &serde_json::json!({}),
            )
            .await?;
        if !response.success {
            return Err(rejected(&response.message, "backend refused to clear the cache"));
        }
        Ok(response)
    }

    async fn stats(&self) -> Result<StatsResponse> {
        let response: StatsResponse = self
            .get(&T::CATEGORY.action_path(ApiAction::Stats))
            .await?;
        if !response.success {
            return Err(rejected("", "backend rejected the stats request"));
        }
        Ok(response)
    }

    async fn export(&self) -> Result<ExportResponse<T>> {
        let response: ExportResponse<T> = self
            .get(&T::CATEGORY.action_path(ApiAction::Export))
            .await?;
        if !response.success {
            return Err(rejected("", "backend rejected the export request"));
        }
        Ok(response)
    }

    async fn task_status(&self, task_id: &str) -> Result<Option<TaskStatusResponse>> {
        let path = format!("api/task-status/{task_id}/");
        match self.get::<TaskStatusResponse>(&path).await {
            Ok(status) => Ok(Some(status)),
            Err(ClientError::Api { source, .. })
                if source.status == StatusCode::NOT_FOUND.as_u16() =>
            {
                debug!(category = %T::CATEGORY, task_id, "task status endpoint unavailable");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
