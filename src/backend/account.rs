//! Account service client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{HttpBase, read_json};
use crate::error::BackendError;
use crate::traits::AccountSource;
use crate::types::EnvironmentApiKey;

/// Resolves API keys through `POST /v1/api_keys:lookup`.
#[derive(Clone)]
pub struct HttpAccountSource {
    base: HttpBase,
}

impl HttpAccountSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            base: HttpBase::new(base_url, timeout)?,
        })
    }
}

#[derive(Serialize)]
struct LookupRequest<'a> {
    api_key: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    environment_api_key: EnvironmentApiKey,
}

#[async_trait]
impl AccountSource for HttpAccountSource {
    async fn get_api_key_by_token(&self, token: &str) -> Result<EnvironmentApiKey, BackendError> {
        // Token goes in the body so it stays out of access logs.
        let response = self
            .base
            .client()
            .post(self.base.url("/v1/api_keys:lookup"))
            .json(&LookupRequest { api_key: token })
            .send()
            .await?;
        let body: LookupResponse = read_json(response).await?;
        Ok(body.environment_api_key)
    }
}
