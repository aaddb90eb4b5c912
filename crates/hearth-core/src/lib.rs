pub mod envelope;
pub mod events;
pub mod ids;
pub mod records;

pub use envelope::{ChannelFrame, Correlation, RequestEnvelope, RequestType, ResponseEnvelope};
pub use events::{EventType, Notification};
pub use ids::{ContextId, MemberId, ModelName, RequestId, SubscriberId};
pub use records::{
    CircleSession, JournalItem, NewJournalEntry, ProfileSummary, TeamMember, XpTotals,
};

/// Wall-clock milliseconds, used for envelope timestamps.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_hydrate_from_the_crate_root() {
        let member: TeamMember =
            serde_json::from_value(json!({ "id": "ana", "displayName": "Ana" })).unwrap();
        assert_eq!(member.id, MemberId::from_raw("ana"));
        assert!(!member.online);

        let summary: ProfileSummary = serde_json::from_value(json!({
            "memberId": "ana",
            "displayName": "Ana",
            "xp": { "total": 10, "level": 0, "nextLevelAt": 250 }
        }))
        .unwrap();
        assert_eq!(summary.xp, XpTotals { total: 10, level: 0, next_level_at: 250 });
    }
}
