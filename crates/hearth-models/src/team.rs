//! The local user's team roster and the member currently being viewed.

use std::sync::Arc;

use hearth_core::{
    EventType, MemberId, ModelName, Notification, RequestType, SubscriberId, TeamMember,
};
use hearth_sync::{AppContext, List, ListenerRegistry, Model, RemoteFetcher};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::error::{ModelError, Result};

pub const TEAM: &str = "team";

#[derive(Default)]
struct Roster {
    members: Vec<TeamMember>,
    selected: Option<MemberId>,
}

pub struct TeamModel {
    fetcher: RemoteFetcher,
    listeners: Arc<ListenerRegistry>,
    roster: Mutex<Roster>,
}

impl TeamModel {
    pub fn new(fetcher: RemoteFetcher) -> Self {
        Self {
            fetcher,
            listeners: Arc::new(ListenerRegistry::new(ModelName::from_raw(TEAM))),
            roster: Mutex::new(Roster::default()),
        }
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    pub fn register_listener<F>(&self, subscriber: &SubscriberId, event: EventType, listener: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.listeners.register_listener(subscriber, event, listener);
    }

    pub fn unregister_all_listeners(&self, subscriber: &SubscriberId) -> usize {
        self.listeners.unregister_all_listeners(subscriber)
    }

    /// Reload the roster. A selected member who left the team is deselected.
    pub async fn refresh(&self) -> Result<Vec<TeamMember>> {
        let members = self
            .fetcher
            .fetch::<List<TeamMember>>(Value::Null, "/team/me", RequestType::Get)
            .await?;

        let dropped_selection = {
            let mut roster = self.roster.lock();
            let dropped = roster
                .selected
                .as_ref()
                .is_some_and(|id| !members.iter().any(|m| &m.id == id));
            if dropped {
                roster.selected = None;
            }
            roster.members = members.clone();
            dropped
        };

        self.listeners.notify_listeners(EventType::TeamUpdated);
        if dropped_selection {
            debug!("selected member left the team");
            self.listeners.notify_listeners(EventType::TeamMemberSelected);
        }
        Ok(members)
    }

    pub fn members(&self) -> Vec<TeamMember> {
        self.roster.lock().members.clone()
    }

    /// Select `member` for viewing. Selecting the current member is a no-op
    /// returning `false`.
    pub fn select_member(&self, member: &MemberId) -> Result<bool> {
        {
            let mut roster = self.roster.lock();
            if !roster.members.iter().any(|m| &m.id == member) {
                return Err(ModelError::UnknownMember {
                    member: member.clone(),
                });
            }
            if roster.selected.as_ref() == Some(member) {
                return Ok(false);
            }
            roster.selected = Some(member.clone());
        }
        self.listeners.notify_listeners(EventType::TeamMemberSelected);
        Ok(true)
    }

    pub fn clear_selection(&self) -> bool {
        if self.roster.lock().selected.take().is_none() {
            return false;
        }
        self.listeners.notify_listeners(EventType::TeamMemberSelected);
        true
    }

    pub fn selected_member(&self) -> Option<TeamMember> {
        let roster = self.roster.lock();
        let id = roster.selected.as_ref()?;
        roster.members.iter().find(|m| &m.id == id).cloned()
    }
}

impl Model for TeamModel {
    const NAME: &'static str = TEAM;

    fn create(ctx: &AppContext, _owner: &MemberId) -> Self {
        Self::new(ctx.fetcher(TEAM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{events, owner, record, Harness};
    use hearth_sync::host::mock::MockReply;
    use hearth_sync::MockHost;
    use serde_json::json;

    fn roster() -> Value {
        json!([
            { "id": "ana", "displayName": "Ana", "online": true },
            { "id": "ben", "displayName": "Ben" }
        ])
    }

    #[tokio::test]
    async fn refresh_loads_roster() {
        let h = Harness::start(MockHost::new().with_data(RequestType::Get, "/team/me", roster()));
        let team = h.ctx.model::<TeamModel>(&owner()).unwrap();
        let seen = record(team.listeners(), &[EventType::TeamUpdated]);

        let members = team.refresh().await.unwrap();

        assert_eq!(members.len(), 2);
        assert!(!members[1].online);
        assert_eq!(team.members(), members);
        assert_eq!(events(&seen), vec![EventType::TeamUpdated]);
    }

    #[tokio::test]
    async fn selecting_same_member_twice_notifies_once() {
        let h = Harness::start(MockHost::new().with_data(RequestType::Get, "/team/me", roster()));
        let team = h.ctx.model::<TeamModel>(&owner()).unwrap();
        team.refresh().await.unwrap();
        let seen = record(team.listeners(), &[EventType::TeamMemberSelected]);

        let ana = MemberId::from_raw("ana");
        assert!(team.select_member(&ana).unwrap());
        assert!(!team.select_member(&ana).unwrap());
        assert_eq!(team.selected_member().map(|m| m.display_name), Some("Ana".into()));
        assert_eq!(events(&seen).len(), 1);

        assert!(team.clear_selection());
        assert!(!team.clear_selection());
        assert!(team.selected_member().is_none());
        assert_eq!(events(&seen).len(), 2);
    }

    #[tokio::test]
    async fn unknown_member_cannot_be_selected() {
        let h = Harness::start(MockHost::new().with_data(RequestType::Get, "/team/me", roster()));
        let team = h.ctx.model::<TeamModel>(&owner()).unwrap();
        team.refresh().await.unwrap();

        let err = team.select_member(&MemberId::from_raw("zed")).unwrap_err();
        assert!(matches!(err, ModelError::UnknownMember { .. }));
    }

    #[tokio::test]
    async fn refresh_drops_departed_selection() {
        let h = Harness::start(MockHost::new().with_data(RequestType::Get, "/team/me", roster()));
        let team = h.ctx.model::<TeamModel>(&owner()).unwrap();
        team.refresh().await.unwrap();
        team.select_member(&MemberId::from_raw("ben")).unwrap();
        let seen = record(
            team.listeners(),
            &[EventType::TeamUpdated, EventType::TeamMemberSelected],
        );

        h.host.set_route(
            RequestType::Get,
            "/team/me",
            MockReply::Data(json!([{ "id": "ana", "displayName": "Ana" }])),
        );
        team.refresh().await.unwrap();

        assert!(team.selected_member().is_none());
        assert_eq!(
            events(&seen),
            vec![EventType::TeamUpdated, EventType::TeamMemberSelected]
        );
    }
}
