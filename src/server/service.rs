//! gRPC service implementation.
//!
//! Thin transport over [`Gateway`]: pulls the credential out of request
//! metadata, converts wire shapes and maps [`GatewayError`] codes onto
//! `tonic::Code`.

use std::sync::Arc;

use tokio_util::sync::{CancellationToken, DropGuard};
use tonic::{Request, Response, Status};

use super::proto;
use super::proto::gateway_server::Gateway as GatewayRpc;
use crate::context::RequestContext;
use crate::error::{ErrorCode, GatewayError};
use crate::evaluation::selection::now_unix;
use crate::gateway::Gateway;

/// Metadata key carrying the environment API key.
pub const AUTHORIZATION: &str = "authorization";

/// gRPC service that wraps a [`Gateway`].
pub struct HeimdallService {
    gateway: Arc<Gateway>,
}

impl HeimdallService {
    /// Create a new service wrapping the given gateway.
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Wrap in the generated tonic server.
    pub fn into_server(self) -> proto::gateway_server::GatewayServer<Self> {
        proto::gateway_server::GatewayServer::new(self)
    }
}

/// Build a request context from metadata. The returned guard cancels the
/// context when the handler future is dropped (client went away).
fn request_context<T>(request: &Request<T>) -> (RequestContext, DropGuard) {
    let api_key = request
        .metadata()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let token = CancellationToken::new();
    let ctx = RequestContext::new(api_key).with_cancellation(token.clone());
    (ctx, token.drop_guard())
}

impl From<ErrorCode> for tonic::Code {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Canceled => tonic::Code::Cancelled,
            ErrorCode::Unauthenticated => tonic::Code::Unauthenticated,
            ErrorCode::PermissionDenied => tonic::Code::PermissionDenied,
            ErrorCode::InvalidArgument => tonic::Code::InvalidArgument,
            ErrorCode::NotFound => tonic::Code::NotFound,
            ErrorCode::Internal => tonic::Code::Internal,
            ErrorCode::ResourceExhausted => tonic::Code::ResourceExhausted,
        }
    }
}

impl From<GatewayError> for Status {
    fn from(err: GatewayError) -> Self {
        Status::new(err.code().into(), err.to_string())
    }
}

#[tonic::async_trait]
impl GatewayRpc for HeimdallService {
    async fn ping(
        &self,
        _request: Request<proto::PingRequest>,
    ) -> Result<Response<proto::PingResponse>, Status> {
        Ok(Response::new(proto::PingResponse { time: now_unix() }))
    }

    async fn get_evaluations(
        &self,
        request: Request<proto::GetEvaluationsRequest>,
    ) -> Result<Response<proto::GetEvaluationsResponse>, Status> {
        let (ctx, _guard) = request_context(&request);
        let response = self
            .gateway
            .get_evaluations(&ctx, request.into_inner().into())
            .await?;
        Ok(Response::new(response.into()))
    }

    async fn get_evaluation(
        &self,
        request: Request<proto::GetEvaluationRequest>,
    ) -> Result<Response<proto::GetEvaluationResponse>, Status> {
        let (ctx, _guard) = request_context(&request);
        let response = self
            .gateway
            .get_evaluation(&ctx, request.into_inner().into())
            .await?;
        Ok(Response::new(response.into()))
    }

    async fn get_feature_flags(
        &self,
        request: Request<proto::GetFeatureFlagsRequest>,
    ) -> Result<Response<proto::GetFeatureFlagsResponse>, Status> {
        let (ctx, _guard) = request_context(&request);
        let response = self
            .gateway
            .get_feature_flags(&ctx, request.into_inner().into())
            .await?;
        Ok(Response::new(response.into()))
    }

    async fn get_segment_users(
        &self,
        request: Request<proto::GetSegmentUsersRequest>,
    ) -> Result<Response<proto::GetSegmentUsersResponse>, Status> {
        let (ctx, _guard) = request_context(&request);
        let response = self
            .gateway
            .get_segment_users(&ctx, request.into_inner().into())
            .await?;
        Ok(Response::new(response.into()))
    }

    async fn register_events(
        &self,
        request: Request<proto::RegisterEventsRequest>,
    ) -> Result<Response<proto::RegisterEventsResponse>, Status> {
        let (ctx, _guard) = request_context(&request);
        let response = self
            .gateway
            .register_events(&ctx, request.into_inner().into())
            .await?;
        Ok(Response::new(response.into()))
    }

    async fn track(
        &self,
        request: Request<proto::TrackRequest>,
    ) -> Result<Response<proto::TrackResponse>, Status> {
        let (ctx, _guard) = request_context(&request);
        self.gateway
            .track(&ctx, request.into_inner().into())
            .await?;
        Ok(Response::new(proto::TrackResponse {}))
    }

    async fn run_job(
        &self,
        request: Request<proto::RunJobRequest>,
    ) -> Result<Response<proto::RunJobResponse>, Status> {
        let (ctx, _guard) = request_context(&request);
        self.gateway.run_job(&ctx, request.into_inner().job).await?;
        Ok(Response::new(proto::RunJobResponse {}))
    }
}
