//! SDK-reported operational telemetry.
//!
//! Metrics events are not published to the pipeline. They are folded into
//! local counters and histograms on a detached task, best-effort.

use std::collections::HashMap;

use tracing::error;

use crate::telemetry;
use crate::types::{ApiId, MetricsEvent, MetricsEventKind};

use super::events::CODE_NON_REPEATABLE_ERROR;

/// Why a metrics event could not be recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsSaveError {
    #[error("gateway: unknown metrics event")]
    UnknownEvent,

    #[error("gateway: metrics event has invalid duration")]
    InvalidDuration,

    #[error("gateway: metrics event has unknown api id")]
    UnknownApiId,
}

/// Record `events` on a detached task; outcomes are counted and logged only.
pub(crate) fn save_metrics_events_async(events: Vec<MetricsEvent>, environment_id: String) {
    if events.is_empty() {
        return;
    }
    tokio::spawn(async move {
        for event in &events {
            let code = match save_metrics_event(event, &environment_id) {
                Ok(()) => "OK",
                Err(err) => {
                    error!(error = %err, environment_id = %environment_id, "failed to store metrics event");
                    CODE_NON_REPEATABLE_ERROR
                }
            };
            metrics::counter!(telemetry::REGISTER_EVENTS_TOTAL, "type" => "Metrics", "code" => code)
                .increment(1);
        }
    });
}

fn label(labels: &HashMap<String, String>, name: &str) -> String {
    labels.get(name).cloned().unwrap_or_default()
}

fn known_api(api_id: ApiId) -> Result<&'static str, MetricsSaveError> {
    match api_id {
        ApiId::UnknownApi => Err(MetricsSaveError::UnknownApiId),
        api => Ok(api.as_str()),
    }
}

/// Fold one metrics event into the SDK telemetry series.
pub(crate) fn save_metrics_event(
    event: &MetricsEvent,
    environment_id: &str,
) -> Result<(), MetricsSaveError> {
    let env = environment_id.to_owned();
    let sdk_version = event.sdk_version.clone();
    let source_id = event.source_id.as_str();

    match &event.kind {
        MetricsEventKind::GetEvaluationLatency { labels, duration } => {
            let duration = duration.ok_or(MetricsSaveError::InvalidDuration)?;
            metrics::histogram!(telemetry::SDK_GET_EVALUATIONS_LATENCY_SECONDS,
                "environment_id" => env,
                "tag" => label(labels, "tag"),
                "state" => label(labels, "state"),
            )
            .record(duration.as_secs_f64());
        }
        MetricsEventKind::GetEvaluationSize { labels, size_byte } => {
            metrics::histogram!(telemetry::SDK_GET_EVALUATIONS_SIZE_BYTES,
                "environment_id" => env,
                "tag" => label(labels, "tag"),
                "state" => label(labels, "state"),
            )
            .record(f64::from(*size_byte));
        }
        MetricsEventKind::TimeoutErrorCount { tag } => {
            metrics::counter!(telemetry::SDK_TIMEOUT_ERRORS_TOTAL,
                "environment_id" => env,
                "tag" => tag.clone(),
            )
            .increment(1);
        }
        MetricsEventKind::InternalErrorCount { tag } => {
            metrics::counter!(telemetry::SDK_INTERNAL_ERRORS_TOTAL,
                "environment_id" => env,
                "tag" => tag.clone(),
            )
            .increment(1);
        }
        MetricsEventKind::Latency {
            api_id,
            labels,
            duration,
            latency_second,
        } => {
            // Newer SDKs send seconds; older ones a duration.
            let seconds = if *latency_second != 0.0 {
                *latency_second
            } else {
                duration.ok_or(MetricsSaveError::InvalidDuration)?.as_secs_f64()
            };
            let api = known_api(*api_id)?;
            metrics::histogram!(telemetry::SDK_LATENCY_SECONDS,
                "environment_id" => env,
                "tag" => label(labels, "tag"),
                "api_id" => api,
                "sdk_version" => sdk_version,
                "source_id" => source_id,
            )
            .record(seconds);
        }
        MetricsEventKind::Size {
            api_id,
            labels,
            size_byte,
        } => {
            let api = known_api(*api_id)?;
            metrics::histogram!(telemetry::SDK_SIZE_BYTES,
                "environment_id" => env,
                "tag" => label(labels, "tag"),
                "api_id" => api,
                "sdk_version" => sdk_version,
                "source_id" => source_id,
            )
            .record(f64::from(*size_byte));
        }
        MetricsEventKind::Error {
            error_type,
            api_id,
            labels,
        } => {
            let api = known_api(*api_id)?;
            metrics::counter!(telemetry::SDK_ERRORS_TOTAL,
                "environment_id" => env,
                "tag" => label(labels, "tag"),
                "error_type" => error_type.label(),
                "api_id" => api,
                "sdk_version" => sdk_version,
                "source_id" => source_id,
            )
            .increment(1);
        }
        MetricsEventKind::Unrecognized { .. } => return Err(MetricsSaveError::UnknownEvent),
    }
    Ok(())
}
