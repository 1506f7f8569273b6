//! Feature service client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{HttpBase, read_json};
use crate::error::BackendError;
use crate::traits::{FeaturePage, FeatureSource};
use crate::types::{Feature, Segment, SegmentUser};

/// Flag definitions and segment membership over
/// `/v1/environments/{environment_id}/...`.
#[derive(Clone)]
pub struct HttpFeatureSource {
    base: HttpBase,
}

impl HttpFeatureSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            base: HttpBase::new(base_url, timeout)?,
        })
    }
}

#[derive(Deserialize)]
struct ListFeaturesResponse {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    cursor: String,
}

#[derive(Deserialize)]
struct ListSegmentUsersResponse {
    #[serde(default)]
    users: Vec<SegmentUser>,
}

#[derive(Deserialize)]
struct GetSegmentResponse {
    segment: Segment,
}

#[async_trait]
impl FeatureSource for HttpFeatureSource {
    async fn list_features(
        &self,
        environment_id: &str,
        cursor: &str,
        page_size: usize,
    ) -> Result<FeaturePage, BackendError> {
        let page_size = page_size.to_string();
        let response = self
            .base
            .client()
            .get(self.base.url(&format!("/v1/environments/{environment_id}/features")))
            .query(&[("cursor", cursor), ("page_size", page_size.as_str())])
            .send()
            .await?;
        let body: ListFeaturesResponse = read_json(response).await?;
        Ok(FeaturePage {
            features: body.features,
            cursor: body.cursor,
        })
    }

    async fn list_segment_users(
        &self,
        environment_id: &str,
        segment_id: &str,
    ) -> Result<Vec<SegmentUser>, BackendError> {
        let response = self
            .base
            .client()
            .get(self.base.url(&format!(
                "/v1/environments/{environment_id}/segments/{segment_id}/users"
            )))
            .send()
            .await?;
        let body: ListSegmentUsersResponse = read_json(response).await?;
        Ok(body.users)
    }

    async fn get_segment(
        &self,
        environment_id: &str,
        segment_id: &str,
    ) -> Result<Segment, BackendError> {
        let response = self
            .base
            .client()
            .get(self.base.url(&format!(
                "/v1/environments/{environment_id}/segments/{segment_id}"
            )))
            .send()
            .await?;
        let body: GetSegmentResponse = read_json(response).await?;
        Ok(body.segment)
    }
}
