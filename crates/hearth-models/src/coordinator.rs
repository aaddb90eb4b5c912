//! Cross-model wiring.
//!
//! The coordinator obtains every primary model once, kicks off their initial
//! loads and subscribes the reactions that keep dependent models current:
//!
//! | journal / team event           | reaction                                  |
//! |--------------------------------|-------------------------------------------|
//! | `journal-new-entry`            | profile `refresh_xp`, team `refresh`      |
//! | `journal-history-update`       | profile `reset_rating(active rating)`     |
//! | `journal-active-item-changed`  | profile `reset_rating(active rating)`     |
//! | `team-member-selected`         | journal, profile, circle `view_member`    |
//!
//! Reactions that fetch run on spawned tasks, so listener callbacks return
//! immediately.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::{EventType, MemberId, SubscriberId};
use hearth_sync::AppContext;
use tracing::{debug, info, warn};

use crate::circle::CircleModel;
use crate::error::{ModelError, Result};
use crate::journal::JournalModel;
use crate::profile::ProfileModel;
use crate::team::TeamModel;

pub struct ModelCoordinator {
    subscriber: SubscriberId,
    journal: Arc<JournalModel>,
    profile: Arc<ProfileModel>,
    team: Arc<TeamModel>,
    circle: Arc<CircleModel>,
    attached: AtomicBool,
}

impl ModelCoordinator {
    /// Obtain the models, wire them together and run the initial loads.
    /// Load failures are logged; the coordinator still starts.
    pub async fn start(ctx: &AppContext, owner: &MemberId) -> Result<Self> {
        let coordinator = Self::attach(ctx, owner)?;
        coordinator.initial_load().await;
        Ok(coordinator)
    }

    /// Obtain the models and wire them together without loading anything.
    pub fn attach(ctx: &AppContext, owner: &MemberId) -> Result<Self> {
        let coordinator = Self {
            subscriber: SubscriberId::from_raw(ctx.settings().sync.coordinator_subscriber.clone()),
            journal: ctx.model::<JournalModel>(owner)?,
            profile: ctx.model::<ProfileModel>(owner)?,
            team: ctx.model::<TeamModel>(owner)?,
            circle: ctx.model::<CircleModel>(owner)?,
            attached: AtomicBool::new(true),
        };
        coordinator.wire();
        info!(owner = %owner, subscriber = %coordinator.subscriber, "model coordinator attached");
        Ok(coordinator)
    }

    async fn initial_load(&self) {
        let (journal, profile, team, circle) = futures::join!(
            self.journal.load_default_feed(),
            self.profile.load_profile(),
            self.team.refresh(),
            self.circle.load_active_session(),
        );
        report("journal.load_default_feed", journal.map(drop));
        report("profile.load_profile", profile.map(drop));
        report("team.refresh", team.map(drop));
        report("circle.load_active_session", circle.map(drop));

        // The profile reply may land after the feed's history update and
        // overwrite the rating taken from the active item.
        if let Some(item) = self.journal.active_item() {
            report("profile.reset_rating", self.profile.reset_rating(item.rating).map(drop));
        }
    }

    fn wire(&self) {
        let sub = &self.subscriber;

        {
            let profile = Arc::downgrade(&self.profile);
            let team = Arc::downgrade(&self.team);
            self.journal
                .register_listener(sub, EventType::JournalNewEntry, move |_| {
                    if let Some(profile) = profile.upgrade() {
                        spawn_reaction("profile.refresh_xp", async move {
                            profile.refresh_xp().await.map(drop)
                        });
                    }
                    if let Some(team) = team.upgrade() {
                        spawn_reaction("team.refresh", async move {
                            team.refresh().await.map(drop)
                        });
                    }
                });
        }

        for event in [
            EventType::JournalHistoryUpdate,
            EventType::JournalActiveItemChanged,
        ] {
            let journal = Arc::downgrade(&self.journal);
            let profile = Arc::downgrade(&self.profile);
            self.journal.register_listener(sub, event, move |_| {
                let (Some(journal), Some(profile)) = (journal.upgrade(), profile.upgrade()) else {
                    return;
                };
                if let Some(item) = journal.active_item() {
                    report("profile.reset_rating", profile.reset_rating(item.rating).map(drop));
                }
            });
        }

        {
            let team = Arc::downgrade(&self.team);
            let journal = Arc::downgrade(&self.journal);
            let profile = Arc::downgrade(&self.profile);
            let circle = Arc::downgrade(&self.circle);
            self.team
                .register_listener(sub, EventType::TeamMemberSelected, move |_| {
                    let (Some(team), Some(journal), Some(profile), Some(circle)) = (
                        team.upgrade(),
                        journal.upgrade(),
                        profile.upgrade(),
                        circle.upgrade(),
                    ) else {
                        return;
                    };
                    retarget(&team, journal, profile, circle);
                });
        }
    }

    /// Detach every coordinator listener from every model. Safe to call more
    /// than once; returns how many listener entries were removed.
    pub fn shutdown(&self) -> usize {
        if !self.attached.swap(false, Ordering::SeqCst) {
            return 0;
        }
        let removed = self.journal.unregister_all_listeners(&self.subscriber)
            + self.profile.unregister_all_listeners(&self.subscriber)
            + self.team.unregister_all_listeners(&self.subscriber)
            + self.circle.unregister_all_listeners(&self.subscriber);
        info!(removed, "model coordinator detached");
        removed
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn subscriber(&self) -> &SubscriberId {
        &self.subscriber
    }

    pub fn journal(&self) -> &Arc<JournalModel> {
        &self.journal
    }

    pub fn profile(&self) -> &Arc<ProfileModel> {
        &self.profile
    }

    pub fn team(&self) -> &Arc<TeamModel> {
        &self.team
    }

    pub fn circle(&self) -> &Arc<CircleModel> {
        &self.circle
    }
}

impl Drop for ModelCoordinator {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Point the member-scoped models at the team's current selection and load
/// whatever the new scope is missing.
fn retarget(
    team: &TeamModel,
    journal: Arc<JournalModel>,
    profile: Arc<ProfileModel>,
    circle: Arc<CircleModel>,
) {
    let Some(member) = team.selected_member() else {
        let _ = journal.view_self();
        let _ = profile.view_self();
        let _ = circle.view_self();
        return;
    };

    if journal.view_member(&member) {
        follow_selection(journal);
    }
    if profile.view_member(&member) {
        follow_selection(profile);
    }
    if circle.view_member(&member) {
        follow_selection(circle);
    }
}

/// A model whose data can be scoped to a selected team member.
#[async_trait]
trait MemberScoped: Send + Sync + 'static {
    const LOAD: &'static str;

    fn unloaded_member(&self) -> Option<MemberId>;
    async fn load_selected(&self) -> Result<()>;
}

#[async_trait]
impl MemberScoped for JournalModel {
    const LOAD: &'static str = "journal.load_default_feed";

    fn unloaded_member(&self) -> Option<MemberId> {
        JournalModel::unloaded_member(self)
    }

    async fn load_selected(&self) -> Result<()> {
        self.load_default_feed().await.map(drop)
    }
}

#[async_trait]
impl MemberScoped for ProfileModel {
    const LOAD: &'static str = "profile.load_profile";

    fn unloaded_member(&self) -> Option<MemberId> {
        ProfileModel::unloaded_member(self)
    }

    async fn load_selected(&self) -> Result<()> {
        self.load_profile().await.map(drop)
    }
}

#[async_trait]
impl MemberScoped for CircleModel {
    const LOAD: &'static str = "circle.load_active_session";

    fn unloaded_member(&self) -> Option<MemberId> {
        CircleModel::unloaded_member(self)
    }

    async fn load_selected(&self) -> Result<()> {
        self.load_active_session().await.map(drop)
    }
}

/// Load until the current selection is covered. A reply for a member that was
/// deselected mid-flight is discarded by the model, so the loop asks again for
/// whoever is selected now. When another load holds the fetcher, that load's
/// task does the re-check once its reply lands.
fn follow_selection<M: MemberScoped>(model: Arc<M>) {
    let _ = tokio::spawn(async move {
        while let Some(member) = model.unloaded_member() {
            match model.load_selected().await {
                Ok(()) => {}
                Err(e) if e.is_call_in_progress() => {
                    debug!(operation = M::LOAD, member = %member, "load already running");
                    return;
                }
                Err(e) => {
                    report(M::LOAD, Err(e));
                    return;
                }
            }
        }
    });
}

fn spawn_reaction<F>(operation: &'static str, work: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let _ = tokio::spawn(async move { report(operation, work.await) });
}

fn report(operation: &'static str, outcome: Result<()>) {
    match outcome {
        Ok(()) => {}
        Err(e) if e.is_call_in_progress() => {
            warn!(operation, "skipped, call already in progress");
        }
        Err(ModelError::Fetch(e)) => {
            warn!(operation, error_kind = e.error_kind(), error = %e, "background load failed");
        }
        Err(e) => warn!(operation, error = %e, "background operation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{journal_item, owner, Harness};
    use hearth_core::{NewJournalEntry, RequestType};
    use hearth_sync::host::mock::MockReply;
    use hearth_sync::MockHost;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn host() -> MockHost {
        MockHost::new()
            .with_data(
                RequestType::Get,
                "/journal/me",
                json!([journal_item(1, "walk", 7), journal_item(2, "swim", 3)]),
            )
            .with_data(RequestType::Post, "/journal/me", journal_item(3, "run", 9))
            .with_data(
                RequestType::Get,
                "/spirit/me",
                json!({ "memberId": "me", "displayName": "Sam", "rating": 5 }),
            )
            .with_data(
                RequestType::Get,
                "/spirit/me/xp",
                json!({ "total": 120, "level": 1, "nextLevelAt": 200 }),
            )
            .with_data(
                RequestType::Get,
                "/team/me",
                json!([{ "id": "ana", "displayName": "Ana", "online": true }]),
            )
            .with_data(RequestType::Get, "/circle/me/active", Value::Null)
            .with_data(RequestType::Get, "/journal/ana", json!([journal_item(10, "ana", 2)]))
            .with_data(
                RequestType::Get,
                "/spirit/ana",
                json!({ "memberId": "ana", "displayName": "Ana", "rating": 2 }),
            )
            .with_data(RequestType::Get, "/circle/ana/active", Value::Null)
    }

    /// Let spawned reactions and their replies run.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn start_loads_every_model() {
        let h = Harness::start(host());
        let coordinator = ModelCoordinator::start(&h.ctx, &owner()).await.unwrap();

        assert_eq!(coordinator.journal().all_items().len(), 2);
        assert_eq!(coordinator.team().members().len(), 1);
        assert_eq!(coordinator.profile().owner_display_name(), "Sam");
        assert!(coordinator.circle().session().is_none());
        assert!(Arc::ptr_eq(
            coordinator.journal(),
            &h.ctx.model::<JournalModel>(&owner()).unwrap()
        ));
    }

    #[tokio::test]
    async fn active_item_drives_rating() {
        let h = Harness::start(host());
        let coordinator = ModelCoordinator::start(&h.ctx, &owner()).await.unwrap();

        coordinator.journal().set_active_item(2).unwrap();
        assert_eq!(coordinator.profile().rating(), 3);
    }

    #[tokio::test]
    async fn history_update_drives_rating() {
        let h = Harness::start(host());
        let coordinator = ModelCoordinator::start(&h.ctx, &owner()).await.unwrap();
        assert_eq!(coordinator.profile().rating(), 7);

        // The active item is gone from the reloaded feed, so the newest entry
        // takes over and its rating follows.
        h.host.set_route(
            RequestType::Get,
            "/journal/me",
            MockReply::Data(json!([journal_item(4, "yoga", 4), journal_item(2, "swim", 3)])),
        );
        coordinator.journal().load_default_feed().await.unwrap();

        assert_eq!(coordinator.journal().active_item().map(|i| i.id), Some(4));
        assert_eq!(coordinator.profile().rating(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn late_profile_reply_keeps_active_item_rating() {
        let h = Harness::start(host().with_route(
            RequestType::Get,
            "/spirit/me",
            MockReply::delayed(
                Duration::from_millis(50),
                MockReply::Data(json!({ "memberId": "me", "displayName": "Sam", "rating": 5 })),
            ),
        ));
        let coordinator = ModelCoordinator::start(&h.ctx, &owner()).await.unwrap();

        assert_eq!(coordinator.profile().owner_display_name(), "Sam");
        assert_eq!(coordinator.profile().rating(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn late_journal_reply_sets_rating() {
        let h = Harness::start(host().with_route(
            RequestType::Get,
            "/journal/me",
            MockReply::delayed(
                Duration::from_millis(50),
                MockReply::Data(json!([journal_item(1, "walk", 7), journal_item(2, "swim", 3)])),
            ),
        ));
        let coordinator = ModelCoordinator::start(&h.ctx, &owner()).await.unwrap();

        assert_eq!(coordinator.profile().rating(), 7);
    }

    #[tokio::test]
    async fn new_entry_refreshes_xp_and_team() {
        let h = Harness::start(host());
        let coordinator = ModelCoordinator::start(&h.ctx, &owner()).await.unwrap();

        let entry = NewJournalEntry {
            title: "run".into(),
            body: String::new(),
            rating: 9,
        };
        coordinator.journal().add_entry(entry).await.unwrap();
        settle().await;

        assert_eq!(h.host.call_count(RequestType::Get, "/spirit/me/xp"), 1);
        assert_eq!(h.host.call_count(RequestType::Get, "/team/me"), 2);
        assert_eq!(coordinator.profile().xp().total, 120);
    }

    #[tokio::test]
    async fn team_selection_retargets_member_models() {
        let h = Harness::start(host());
        let coordinator = ModelCoordinator::start(&h.ctx, &owner()).await.unwrap();

        coordinator
            .team()
            .select_member(&MemberId::from_raw("ana"))
            .unwrap();
        settle().await;

        assert_eq!(coordinator.journal().selected_member(), Some(MemberId::from_raw("ana")));
        assert_eq!(coordinator.journal().all_items()[0].title, "ana");
        assert_eq!(coordinator.profile().rating(), 2);
        assert_eq!(coordinator.circle().owner_display_name(), "Ana");

        coordinator.team().clear_selection();
        assert!(coordinator.journal().selected_member().is_none());
        assert!(coordinator.profile().selected_member().is_none());
        assert!(coordinator.circle().selected_member().is_none());
        assert_eq!(coordinator.journal().all_items().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_members_mid_load_ends_on_the_latest() {
        let h = Harness::start(
            host()
                .with_data(
                    RequestType::Get,
                    "/team/me",
                    json!([
                        { "id": "ana", "displayName": "Ana", "online": true },
                        { "id": "ben", "displayName": "Ben", "online": true },
                    ]),
                )
                .with_route(
                    RequestType::Get,
                    "/journal/ana",
                    MockReply::delayed(
                        Duration::from_millis(100),
                        MockReply::Data(json!([journal_item(10, "ana", 2)])),
                    ),
                )
                .with_route(
                    RequestType::Get,
                    "/circle/ana/active",
                    MockReply::delayed(Duration::from_millis(100), MockReply::Data(Value::Null)),
                )
                .with_data(RequestType::Get, "/journal/ben", json!([journal_item(20, "ben", 6)]))
                .with_data(
                    RequestType::Get,
                    "/spirit/ben",
                    json!({ "memberId": "ben", "displayName": "Ben", "rating": 6 }),
                )
                .with_data(RequestType::Get, "/circle/ben/active", Value::Null),
        );
        let coordinator = ModelCoordinator::start(&h.ctx, &owner()).await.unwrap();
        let ben = MemberId::from_raw("ben");

        coordinator
            .team()
            .select_member(&MemberId::from_raw("ana"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        coordinator.team().select_member(&ben).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        let journal = coordinator.journal();
        assert_eq!(journal.selected_member(), Some(ben.clone()));
        assert_eq!(journal.unloaded_member(), None);
        assert_eq!(journal.all_items()[0].title, "ben");
        assert_eq!(h.host.call_count(RequestType::Get, "/journal/ben"), 1);
        assert_eq!(coordinator.circle().unloaded_member(), None);
        assert_eq!(h.host.call_count(RequestType::Get, "/circle/ben/active"), 1);
        assert_eq!(coordinator.profile().rating(), 6);
    }

    #[tokio::test]
    async fn shutdown_detaches_everything_once() {
        let h = Harness::start(host());
        let coordinator = ModelCoordinator::start(&h.ctx, &owner()).await.unwrap();

        assert_eq!(coordinator.shutdown(), 4);
        assert_eq!(coordinator.shutdown(), 0);
        assert!(!coordinator.is_attached());
        assert_eq!(coordinator.journal().listeners().subscriber_count(), 0);

        coordinator
            .team()
            .select_member(&MemberId::from_raw("ana"))
            .unwrap();
        settle().await;
        assert!(coordinator.journal().selected_member().is_none());
    }

    #[tokio::test]
    async fn drop_detaches_listeners() {
        let h = Harness::start(host());
        let journal = {
            let coordinator = ModelCoordinator::attach(&h.ctx, &owner()).unwrap();
            Arc::clone(coordinator.journal())
        };
        assert_eq!(journal.listeners().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn failed_initial_load_does_not_block_start() {
        let h = Harness::start(host().with_route(
            RequestType::Get,
            "/team/me",
            MockReply::Error("team service down".into()),
        ));
        let coordinator = ModelCoordinator::start(&h.ctx, &owner()).await.unwrap();

        assert!(coordinator.team().members().is_empty());
        assert_eq!(coordinator.journal().all_items().len(), 2);
    }
}
