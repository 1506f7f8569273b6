//! Maintenance job dispatch.

use std::time::Instant;

use tracing::{error, info, instrument};

use super::{Gateway, METHOD_RUN_JOB, record_request};
use crate::Result;
use crate::context::RequestContext;
use crate::error::{BackendError, GatewayError};
use crate::telemetry;
use crate::types::BatchJob;

fn count(job: BatchJob, status: &'static str) {
    metrics::counter!(telemetry::JOBS_TOTAL, "job" => job.as_str(), "status" => status)
        .increment(1);
}

impl Gateway {
    /// Run the job selected by the raw wire value `job` to completion.
    ///
    /// A busy runner answers `ResourceExhausted`; that is admission control,
    /// logged at info.
    #[instrument(skip_all, fields(method = METHOD_RUN_JOB, job = job))]
    pub async fn run_job(&self, ctx: &RequestContext, job: i32) -> Result<()> {
        let start = Instant::now();
        let result = self.run_job_inner(ctx, job).await;
        record_request(METHOD_RUN_JOB, start, &result);
        result
    }

    async fn run_job_inner(&self, ctx: &RequestContext, job: i32) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(GatewayError::Canceled);
        }
        let job = BatchJob::from_i32(job)
            .ok_or_else(|| GatewayError::InvalidArgument(format!("unknown job: {job}")))?;

        let Some(runner) = &self.jobs else {
            error!(job = job.as_str(), "no job runner configured");
            return Err(GatewayError::Internal);
        };

        match runner.run(job).await {
            Ok(()) => {
                count(job, "ok");
                Ok(())
            }
            Err(BackendError::ResourceExhausted(msg)) => {
                info!(job = job.as_str(), reason = %msg, "instance busy, job not started");
                count(job, "busy");
                Err(GatewayError::ResourceExhausted(msg))
            }
            Err(err) => {
                error!(error = %err, job = job.as_str(), "failed to run job");
                count(job, "error");
                Err(GatewayError::Internal)
            }
        }
    }
}
