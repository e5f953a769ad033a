//! HTTP store client
//!
//! Talks JSON over HTTP to the control API every cluster node exposes under
//! [`ClientConfig::base_path`]:
//!
//! - `GET  {base}/status`     -> `{"leader_id": u64, "member_id": u64}`
//! - `PUT  {base}/kv/{key}`   <- raw value
//! - `GET  {base}/kv/{key}`   -> raw value, `404` when absent
//! - `POST {base}/members`    <- `{"add": [u64, ...]}`

use async_trait::async_trait;
use log::debug;
use reqwest::{Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::client::{ClientError, Connector, MemberId, MemberStatus, StoreClient};
use crate::config::ClientConfig;

const TOKEN_HEADER: &str = "X-Raft-Token";

#[derive(Debug, Deserialize)]
struct StatusResponse {
    leader_id: MemberId,
    member_id: MemberId,
}

#[derive(Debug, Serialize)]
struct MembersRequest<'a> {
    add: &'a [MemberId],
}

/// Hands out one [`HttpStoreClient`] per endpoint
#[derive(Debug, Clone)]
pub struct HttpConnector {
    config: ClientConfig,
}

impl HttpConnector {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn StoreClient>, ClientError> {
        let base_url = endpoint_url(endpoint)?;
        let client = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout())
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        debug!("connected to {} ({})", endpoint, base_url);
        Ok(Arc::new(HttpStoreClient {
            endpoint: endpoint.to_string(),
            base_url,
            client,
            config: self.config.clone(),
        }))
    }
}

/// Client bound to a single endpoint; dropping it closes its connection pool
#[derive(Debug)]
pub struct HttpStoreClient {
    endpoint: String,
    base_url: String,
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpStoreClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        self.authorize(request).timeout(timeout).send().await.map_err(transport_error)
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn status(&self) -> Result<MemberStatus, ClientError> {
        let request = self.client.get(self.url(&self.config.status_path()));
        let response = check_status(self.send(request, self.config.status_timeout()).await?)?;
        let status: StatusResponse =
            response.json().await.map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(MemberStatus { leader_id: status.leader_id, member_id: status.member_id })
    }

    async fn write(&self, key: &str, value: &str, timeout: Duration) -> Result<(), ClientError> {
        let request = self.client.put(self.url(&self.config.kv_path(key))).body(value.to_string());
        check_status(self.send(request, timeout).await?)?;
        Ok(())
    }

    async fn read(&self, key: &str, timeout: Duration) -> Result<Option<Vec<u8>>, ClientError> {
        let request = self.client.get(self.url(&self.config.kv_path(key)));
        let response = self.send(request, timeout).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = check_status(response)?.bytes().await.map_err(transport_error)?;
        Ok(Some(body.to_vec()))
    }

    async fn reconfigure(
        &self,
        add_members: &[MemberId],
        timeout: Duration,
    ) -> Result<(), ClientError> {
        let request = self
            .client
            .post(self.url(&self.config.members_path()))
            .json(&MembersRequest { add: add_members });
        check_status(self.send(request, timeout).await?)?;
        Ok(())
    }
}

/// Base URL of an endpoint; a bare `host:port` means plain HTTP
fn endpoint_url(endpoint: &str) -> Result<String, ClientError> {
    let invalid = || ClientError::InvalidEndpoint(endpoint.to_string());

    let trimmed = endpoint.trim();
    let candidate =
        if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{}", trimmed) };

    let url = Url::parse(&candidate).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    // Only the path may carry trailing slashes once the host is known.
    Ok(candidate.trim_end_matches('/').to_string())
}

fn check_status(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ClientError::Status(response.status().as_u16()))
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Transport(e.to_string())
    }
}
