//! Concurrent cache misses share one backing fetch.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::*;
use heimdall::{
    Clause, ClauseOperator, GatewayError, GetFeatureFlagsRequest, GetSegmentUsersRequest,
    RequestContext, Rule, SourceId, Strategy,
};

const CALLERS: usize = 16;

fn flags_request() -> GetFeatureFlagsRequest {
    GetFeatureFlagsRequest {
        tag: "server".into(),
        source_id: SourceId::GoServer,
        sdk_version: "2.0.0".into(),
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_feature_misses_share_one_listing() {
    let features = FakeFeatures::new(vec![flag("f1", &["server"], now())])
        .with_delay(Duration::from_millis(100));
    let harness = Harness::new(features);
    let gateway = Arc::new(harness.gateway());

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway
                .get_feature_flags(&RequestContext::with_api_key(SERVER_KEY), flags_request())
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.features.len(), 1);
        ids.push(response.feature_flags_id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(harness.features.list_calls(), 1);
    assert_eq!(harness.accounts.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_waiters_share_backing_failure() {
    let harness = Harness::new(FakeFeatures::failing().with_delay(Duration::from_millis(100)));
    let gateway = Arc::new(harness.gateway());

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway
                .get_feature_flags(&RequestContext::with_api_key(SERVER_KEY), flags_request())
                .await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap_err(), GatewayError::Internal);
    }
    assert_eq!(harness.features.list_calls(), 1);
}

#[tokio::test]
async fn failed_fetch_is_retried_by_the_next_caller() {
    let harness = Harness::new(FakeFeatures::failing());
    let gateway = harness.gateway();
    let ctx = RequestContext::with_api_key(SERVER_KEY);

    for _ in 0..2 {
        let err = gateway.get_feature_flags(&ctx, flags_request()).await.unwrap_err();
        assert_eq!(err, GatewayError::Internal);
    }
    assert_eq!(harness.features.list_calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_segment_misses_share_one_listing() {
    let t = now();
    let mut feature = flag("f1", &["server"], t);
    feature.rules.push(Rule {
        id: "r1".into(),
        strategy: Strategy::Fixed {
            variation: "off".into(),
        },
        clauses: vec![Clause {
            operator: ClauseOperator::Segment,
            values: vec!["seg-1".into()],
            ..Default::default()
        }],
    });
    let features = FakeFeatures::new(vec![feature])
        .with_segment("seg-1", &["alice"], t)
        .with_delay(Duration::from_millis(50));
    let harness = Harness::new(features);
    let gateway = Arc::new(harness.gateway());

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway
                .get_segment_users(
                    &RequestContext::with_api_key(SERVER_KEY),
                    GetSegmentUsersRequest {
                        requested_at: 0,
                        source_id: SourceId::GoServer,
                        sdk_version: "2.0.0".into(),
                        ..Default::default()
                    },
                )
                .await
        }));
    }
    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.segment_users.len(), 1);
    }
    assert_eq!(harness.features.segment_calls.load(Ordering::SeqCst), 1);
}
