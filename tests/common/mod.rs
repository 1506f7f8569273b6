//! In-process fakes for the gateway's collaborators.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use heimdall::error::{BackendError, PublishError};
use heimdall::traits::{AccountSource, FeaturePage, FeatureSource, JobRunner, Publisher};
use heimdall::{
    ApiKeyRole, BatchJob, EnvironmentApiKey, Event, Feature, Gateway, Heimdall, HeimdallBuilder,
    Segment, SegmentUser, Strategy, Variation,
};

pub const ENV: &str = "env-1";
pub const CLIENT_KEY: &str = "client-key-0001";
pub const SERVER_KEY: &str = "server-key-0001";
pub const DISABLED_KEY: &str = "disabled-key-001";

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

// ============================================================================
// Account service
// ============================================================================

#[derive(Default)]
pub struct FakeAccounts {
    keys: HashMap<String, EnvironmentApiKey>,
    pub calls: AtomicUsize,
}

impl FakeAccounts {
    /// A client key, a server key and a disabled client key, all in [`ENV`].
    pub fn standard() -> Self {
        Self::default()
            .with_key(CLIENT_KEY, ApiKeyRole::SdkClient, false)
            .with_key(SERVER_KEY, ApiKeyRole::SdkServer, false)
            .with_key(DISABLED_KEY, ApiKeyRole::SdkClient, true)
    }

    pub fn with_key(mut self, token: &str, role: ApiKeyRole, disabled: bool) -> Self {
        self.keys.insert(
            token.to_string(),
            EnvironmentApiKey {
                environment_id: ENV.to_string(),
                api_key_id: format!("id-{token}"),
                role,
                disabled,
                ..Default::default()
            },
        );
        self
    }
}

#[async_trait]
impl AccountSource for FakeAccounts {
    async fn get_api_key_by_token(&self, token: &str) -> Result<EnvironmentApiKey, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys
            .get(token)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(token.to_string()))
    }
}

// ============================================================================
// Feature service
// ============================================================================

#[derive(Default)]
pub struct FakeFeatures {
    features: Mutex<Vec<Feature>>,
    segments: Mutex<HashMap<String, (Vec<SegmentUser>, i64)>>,
    delay: Option<Duration>,
    fail: bool,
    pub list_calls: AtomicUsize,
    pub segment_calls: AtomicUsize,
}

impl FakeFeatures {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features: Mutex::new(features),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Every listing sleeps for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_segment(self, segment_id: &str, user_ids: &[&str], updated_at: i64) -> Self {
        let users = user_ids
            .iter()
            .map(|u| SegmentUser {
                id: format!("{segment_id}:{u}"),
                segment_id: segment_id.to_string(),
                user_id: u.to_string(),
                ..Default::default()
            })
            .collect();
        self.segments
            .lock()
            .unwrap()
            .insert(segment_id.to_string(), (users, updated_at));
        self
    }

    pub fn set_features(&self, features: Vec<Feature>) {
        *self.features.lock().unwrap() = features;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureSource for FakeFeatures {
    async fn list_features(
        &self,
        _environment_id: &str,
        _cursor: &str,
        _page_size: usize,
    ) -> Result<FeaturePage, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(BackendError::Unavailable("feature service down".into()));
        }
        Ok(FeaturePage {
            features: self.features.lock().unwrap().clone(),
            cursor: String::new(),
        })
    }

    async fn list_segment_users(
        &self,
        _environment_id: &str,
        segment_id: &str,
    ) -> Result<Vec<SegmentUser>, BackendError> {
        self.segment_calls.fetch_add(1, Ordering::SeqCst);
        self.segments
            .lock()
            .unwrap()
            .get(segment_id)
            .map(|(users, _)| users.clone())
            .ok_or_else(|| BackendError::NotFound(segment_id.to_string()))
    }

    async fn get_segment(
        &self,
        _environment_id: &str,
        segment_id: &str,
    ) -> Result<Segment, BackendError> {
        self.segments
            .lock()
            .unwrap()
            .get(segment_id)
            .map(|(_, updated_at)| Segment {
                id: segment_id.to_string(),
                updated_at: *updated_at,
                ..Default::default()
            })
            .ok_or_else(|| BackendError::NotFound(segment_id.to_string()))
    }
}

// ============================================================================
// Publisher
// ============================================================================

/// Records every published event; ids in `reject` fail with `error`.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<Event>>,
    pub batches: AtomicUsize,
    reject: HashSet<String>,
    error: Option<PublishError>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(ids: &[&str], error: PublishError) -> Self {
        Self {
            reject: ids.iter().map(|s| s.to_string()).collect(),
            error: Some(error),
            ..Default::default()
        }
    }

    /// Fails every event.
    pub fn failing(error: PublishError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn published_ids(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, event: &Event) -> Result<(), PublishError> {
        if let Some(ref error) = self.error
            && (self.reject.is_empty() || self.reject.contains(&event.id))
        {
            return Err(error.clone());
        }
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn publish_multi(&self, events: &[Event]) -> HashMap<String, PublishError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        let mut failures = HashMap::new();
        for event in events {
            if let Err(err) = self.publish(event).await {
                failures.insert(event.id.clone(), err);
            }
        }
        failures
    }
}

// ============================================================================
// Job runner
// ============================================================================

#[derive(Default)]
pub struct FakeJobs {
    pub runs: Mutex<Vec<BatchJob>>,
    pub result: Option<BackendError>,
}

impl FakeJobs {
    pub fn failing(error: BackendError) -> Self {
        Self {
            result: Some(error),
            ..Default::default()
        }
    }
}

#[async_trait]
impl JobRunner for FakeJobs {
    async fn run(&self, job: BatchJob) -> Result<(), BackendError> {
        self.runs.lock().unwrap().push(job);
        match self.result {
            Some(ref err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Enabled flag with `on`/`off` variations, serving `on` by default.
pub fn flag(id: &str, tags: &[&str], updated_at: i64) -> Feature {
    Feature {
        id: id.to_string(),
        name: id.to_string(),
        version: 1,
        enabled: true,
        variations: vec![
            Variation {
                id: "on".into(),
                value: "true".into(),
                name: "on".into(),
                ..Default::default()
            },
            Variation {
                id: "off".into(),
                value: "false".into(),
                name: "off".into(),
                ..Default::default()
            },
        ],
        default_strategy: Some(Strategy::Fixed {
            variation: "on".into(),
        }),
        off_variation: "off".into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        updated_at,
        ..Default::default()
    }
}

/// Collaborators of one test gateway, kept for inspection.
pub struct Harness {
    pub accounts: Arc<FakeAccounts>,
    pub features: Arc<FakeFeatures>,
    pub goals: Arc<RecordingPublisher>,
    pub evaluations: Arc<RecordingPublisher>,
    pub users: Arc<RecordingPublisher>,
}

impl Harness {
    pub fn new(features: FakeFeatures) -> Self {
        Self {
            accounts: Arc::new(FakeAccounts::standard()),
            features: Arc::new(features),
            goals: Arc::new(RecordingPublisher::new()),
            evaluations: Arc::new(RecordingPublisher::new()),
            users: Arc::new(RecordingPublisher::new()),
        }
    }

    pub fn with_goals(mut self, goals: RecordingPublisher) -> Self {
        self.goals = Arc::new(goals);
        self
    }

    pub fn with_evaluations(mut self, evaluations: RecordingPublisher) -> Self {
        self.evaluations = Arc::new(evaluations);
        self
    }

    pub fn builder(&self) -> HeimdallBuilder {
        Heimdall::builder()
            .account_source(self.accounts.clone())
            .feature_source(self.features.clone())
            .goal_publisher(self.goals.clone())
            .evaluation_publisher(self.evaluations.clone())
            .user_publisher(self.users.clone())
    }

    pub fn gateway(&self) -> Gateway {
        self.builder().build().unwrap()
    }
}
