use serde::{Deserialize, Serialize};

use crate::ids::ModelName;

/// Logical notification channel shared by the UI and host processes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    /// Outbound request frames.
    DataLoad,
    /// Inbound reply frames.
    DataLoaded,

    JournalHistoryUpdate,
    JournalNewEntry,
    JournalActiveItemChanged,

    ProfileUpdated,
    XpUpdated,
    RatingChanged,

    TeamUpdated,
    TeamMemberSelected,

    CircleUpdated,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataLoad => "data-load",
            Self::DataLoaded => "data-loaded",
            Self::JournalHistoryUpdate => "journal-history-update",
            Self::JournalNewEntry => "journal-new-entry",
            Self::JournalActiveItemChanged => "journal-active-item-changed",
            Self::ProfileUpdated => "profile-updated",
            Self::XpUpdated => "xp-updated",
            Self::RatingChanged => "rating-changed",
            Self::TeamUpdated => "team-updated",
            Self::TeamMemberSelected => "team-member-selected",
            Self::CircleUpdated => "circle-updated",
        }
    }

    /// Framework-level channels, as opposed to model notifications.
    pub fn is_channel(&self) -> bool {
        matches!(self, Self::DataLoad | Self::DataLoaded)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a listener receives: the event and the model that raised it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub event: EventType,
    pub source: ModelName,
}

impl Notification {
    pub fn new(event: EventType, source: ModelName) -> Self {
        Self { event, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_matches_serde() {
        let all = [
            EventType::DataLoad,
            EventType::DataLoaded,
            EventType::JournalHistoryUpdate,
            EventType::JournalNewEntry,
            EventType::JournalActiveItemChanged,
            EventType::ProfileUpdated,
            EventType::XpUpdated,
            EventType::RatingChanged,
            EventType::TeamUpdated,
            EventType::TeamMemberSelected,
            EventType::CircleUpdated,
        ];
        for event in all {
            let json = serde_json::to_value(event).unwrap();
            assert_eq!(json.as_str(), Some(event.as_str()));
        }
    }

    #[test]
    fn channel_classification() {
        assert!(EventType::DataLoad.is_channel());
        assert!(EventType::DataLoaded.is_channel());
        assert!(!EventType::JournalNewEntry.is_channel());
    }
}
