//! Maintenance jobs reachable through the job dispatch RPC.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchJob {
    ExperimentStatusUpdater,
    ExperimentRunningWatcher,
    FeatureStaleWatcher,
    MauCountWatcher,
    DatetimeWatcher,
    EventCountWatcher,
    FeatureFlagCacher,
    SegmentUserCacher,
    ApiKeyCacher,
    MauPartitionDeleter,
    MauPartitionCreator,
    RedisCounterDeleter,
    ExperimentCalculator,
}

impl BatchJob {
    const ALL: [BatchJob; 13] = [
        BatchJob::ExperimentStatusUpdater,
        BatchJob::ExperimentRunningWatcher,
        BatchJob::FeatureStaleWatcher,
        BatchJob::MauCountWatcher,
        BatchJob::DatetimeWatcher,
        BatchJob::EventCountWatcher,
        BatchJob::FeatureFlagCacher,
        BatchJob::SegmentUserCacher,
        BatchJob::ApiKeyCacher,
        BatchJob::MauPartitionDeleter,
        BatchJob::MauPartitionCreator,
        BatchJob::RedisCounterDeleter,
        BatchJob::ExperimentCalculator,
    ];

    /// Decode a wire value. `None` for values outside the enum.
    pub fn from_i32(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchJob::ExperimentStatusUpdater => "ExperimentStatusUpdater",
            BatchJob::ExperimentRunningWatcher => "ExperimentRunningWatcher",
            BatchJob::FeatureStaleWatcher => "FeatureStaleWatcher",
            BatchJob::MauCountWatcher => "MauCountWatcher",
            BatchJob::DatetimeWatcher => "DatetimeWatcher",
            BatchJob::EventCountWatcher => "EventCountWatcher",
            BatchJob::FeatureFlagCacher => "FeatureFlagCacher",
            BatchJob::SegmentUserCacher => "SegmentUserCacher",
            BatchJob::ApiKeyCacher => "ApiKeyCacher",
            BatchJob::MauPartitionDeleter => "MauPartitionDeleter",
            BatchJob::MauPartitionCreator => "MauPartitionCreator",
            BatchJob::RedisCounterDeleter => "RedisCounterDeleter",
            BatchJob::ExperimentCalculator => "ExperimentCalculator",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_values_are_rejected() {
        assert_eq!(BatchJob::from_i32(0), Some(BatchJob::ExperimentStatusUpdater));
        assert_eq!(BatchJob::from_i32(12), Some(BatchJob::ExperimentCalculator));
        assert_eq!(BatchJob::from_i32(13), None);
        assert_eq!(BatchJob::from_i32(-3), None);
    }
}
