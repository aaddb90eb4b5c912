//! Domain records hydrated from reply payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::MemberId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalItem {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Mood rating recorded with the entry.
    #[serde(default)]
    pub rating: u8,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<MemberId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJournalEntry {
    pub title: String,
    pub body: String,
    pub rating: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpTotals {
    pub total: u64,
    pub level: u32,
    pub next_level_at: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub member_id: MemberId,
    pub display_name: String,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub xp: XpTotals,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: MemberId,
    pub display_name: String,
    #[serde(default)]
    pub online: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleSession {
    pub id: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub paused_seconds: u64,
}

impl CircleSession {
    /// Elapsed active seconds at `now`. Never negative.
    pub fn timer_value_at(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = (now - self.started_at).num_seconds().max(0) as u64;
        elapsed.saturating_sub(self.paused_seconds)
    }
}
