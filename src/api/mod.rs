//! Remote conversation service.
//!
//! The bus only needs two read calls: the most recent conversations (to seed
//! the cursor) and the log since a cursor. [`ConvoApi`] is the seam; the
//! [`XrpcClient`] speaks the `chat.bsky.convo.*` HTTP endpoints.

mod xrpc;

use crate::error::ApiError;
use crate::types::{GetLogParams, ListConvosPage, ListConvosParams, LogPage};
use async_trait::async_trait;

pub use xrpc::{XrpcClient, XrpcConfig, DEFAULT_SERVICE_URL};

/// Read access to the conversation service.
///
/// `authorization` is forwarded untouched as the request credential.
#[async_trait]
pub trait ConvoApi: Send + Sync {
    /// List the caller's conversations, most recently active first.
    async fn list_convos(
        &self,
        params: ListConvosParams,
        authorization: &str,
    ) -> Result<ListConvosPage, ApiError>;

    /// Fetch log entries after `params.cursor`.
    async fn get_log(&self, params: GetLogParams, authorization: &str)
        -> Result<LogPage, ApiError>;
}
