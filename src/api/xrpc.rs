//! HTTP client for the `chat.bsky.convo` XRPC endpoints.

use super::ConvoApi;
use crate::error::ApiError;
use crate::types::{GetLogParams, ListConvosPage, ListConvosParams, LogPage};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_SERVICE_URL: &str = "https://api.bsky.chat";

const LIST_CONVOS: &str = "chat.bsky.convo.listConvos";
const GET_LOG: &str = "chat.bsky.convo.getLog";

/// Transport configuration.
#[derive(Clone, Debug)]
pub struct XrpcConfig {
    /// Base URL of the chat service, without the `/xrpc` suffix.
    pub service_url: String,

    /// Per-request timeout. `None` waits for as long as the server takes.
    pub timeout: Option<Duration>,
}

impl Default for XrpcConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            timeout: None,
        }
    }
}

/// Error body returned by XRPC services.
#[derive(Debug, Deserialize)]
struct XrpcErrorBody {
    error: Option<String>,
    message: Option<String>,
}

pub struct XrpcClient {
    base_url: String,
    client: reqwest::Client,
}

impl XrpcClient {
    pub fn new(config: XrpcConfig) -> Result<Self, ApiError> {
        let base_url = config.service_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::Transport(
                "service url cannot be empty".to_string(),
            ));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url,
            client: builder.build()?,
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
        authorization: &str,
    ) -> Result<T, ApiError> {
        let endpoint = format!("{}/xrpc/{}", self.base_url, method);
        let response = self
            .client
            .get(&endpoint)
            .query(query)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(method, status = status.as_u16(), "xrpc response");

        if !status.is_success() {
            let message = match serde_json::from_str::<XrpcErrorBody>(&body) {
                Ok(XrpcErrorBody {
                    error: Some(error),
                    message: Some(message),
                }) => format!("{error}: {message}"),
                Ok(XrpcErrorBody {
                    error: Some(error), ..
                }) => error,
                _ => body,
            };
            return Err(ApiError::Status {
                method: method.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ConvoApi for XrpcClient {
    async fn list_convos(
        &self,
        params: ListConvosParams,
        authorization: &str,
    ) -> Result<ListConvosPage, ApiError> {
        let mut query = Vec::new();
        if let Some(limit) = params.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = params.cursor {
            query.push(("cursor", cursor));
        }
        self.query(LIST_CONVOS, &query, authorization).await
    }

    async fn get_log(
        &self,
        params: GetLogParams,
        authorization: &str,
    ) -> Result<LogPage, ApiError> {
        let mut query = Vec::new();
        if let Some(cursor) = params.cursor {
            query.push(("cursor", cursor.0));
        }
        self.query(GET_LOG, &query, authorization).await
    }
}
