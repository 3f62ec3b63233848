//! HTTP client for a running balancer.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{BalancerError, Result};
use crate::wire::{
    ConfigureBody, ConfigureResponse, ErrorResponse, LogsResponse, RequestView, ServerNotice,
    ServerView, SubmitBody, SubmitResponse,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct BalancerClient {
    http: reqwest::Client,
    base_url: String,
}

impl BalancerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn configure(
        &self,
        num_servers: i64,
        num_clients: i64,
        requests_per_client: i64,
    ) -> Result<ConfigureResponse> {
        let body = ConfigureBody {
            num_servers,
            num_clients,
            requests_per_client,
        };
        let response = self
            .http
            .post(self.url("/configure"))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn submit(
        &self,
        client_id: u64,
        request_id: u64,
        priority: i64,
    ) -> Result<SubmitResponse> {
        let body = SubmitBody {
            client_id,
            request_id,
            priority,
        };
        let response = self
            .http
            .post(self.url("/send_request"))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn requests(&self) -> Result<Vec<RequestView>> {
        let response = self.http.get(self.url("/requests")).send().await?;
        decode(response).await
    }

    pub async fn servers(&self) -> Result<Vec<ServerView>> {
        let response = self.http.get(self.url("/servers")).send().await?;
        decode(response).await
    }

    pub async fn server_down(&self, server_id: u64) -> Result<ServerNotice> {
        let response = self
            .http
            .post(self.url(&format!("/server_down/{}", server_id)))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn server_up(&self, server_id: u64) -> Result<ServerNotice> {
        let response = self
            .http
            .post(self.url(&format!("/server_up/{}", server_id)))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn logs(&self) -> Result<Vec<String>> {
        let response = self.http.get(self.url("/logs")).send().await?;
        let body: LogsResponse = decode(response).await?;
        Ok(body.logs)
    }

    /// Full timestamped log text, as served for download.
    pub async fn download_logs(&self) -> Result<String> {
        let response = self.http.get(self.url("/logs/download")).send().await?;
        let response = check(response).await?;
        Ok(response.text().await?)
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                body
            }
        });
    Err(rejected(status, message))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check(response).await?;
    Ok(response.json::<T>().await?)
}

fn rejected(status: StatusCode, message: String) -> BalancerError {
    BalancerError::Rejected {
        status: status.as_u16(),
        message,
    }
}
