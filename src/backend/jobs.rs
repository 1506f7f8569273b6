//! Batch service client.

use std::time::Duration;

use async_trait::async_trait;

use super::{HttpBase, check_status};
use crate::error::BackendError;
use crate::traits::JobRunner;
use crate::types::BatchJob;

/// Runs jobs through `POST /v1/jobs/{job}:run`. A `429` answer means the
/// batch instance is busy.
#[derive(Clone)]
pub struct HttpJobRunner {
    base: HttpBase,
}

impl HttpJobRunner {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            base: HttpBase::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl JobRunner for HttpJobRunner {
    async fn run(&self, job: BatchJob) -> Result<(), BackendError> {
        let response = self
            .base
            .client()
            .post(self.base.url(&format!("/v1/jobs/{}:run", job.as_str())))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
