//! User segments.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentUserState {
    #[default]
    Included,
    Excluded,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentUser {
    #[serde(default)]
    pub id: String,
    pub segment_id: String,
    pub user_id: String,
    #[serde(default)]
    pub state: SegmentUserState,
    #[serde(default)]
    pub deleted: bool,
}

/// Segment metadata as returned by the feature service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub deleted: bool,
}

/// Membership snapshot of one segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentUsers {
    pub segment_id: String,
    #[serde(default)]
    pub users: Vec<SegmentUser>,
    #[serde(default)]
    pub updated_at: i64,
}

impl SegmentUsers {
    pub fn includes(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| {
            u.user_id == user_id && !u.deleted && u.state == SegmentUserState::Included
        })
    }
}
