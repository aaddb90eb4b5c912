//! Profile, XP totals and mood rating.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::{
    EventType, MemberId, ModelName, Notification, ProfileSummary, RequestType, SubscriberId,
    TeamMember, XpTotals,
};
use hearth_sync::{
    cascade_notification_chains, AlternateScope, AppContext, DelegationProxy, ListenerRegistry,
    Model, Notifier, One, RemoteFetcher,
};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::support::delegated;

pub const PROFILE: &str = "profile";
pub const PROFILE_ALT: &str = "profile-alt";

/// Ratings are kept within `0..=MAX_RATING`.
pub const MAX_RATING: u8 = 10;

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn load_profile(&self) -> Result<ProfileSummary>;
    async fn refresh_xp(&self) -> Result<XpTotals>;
    fn adjust_rating(&self, delta: i8) -> Result<u8>;
    fn reset_rating(&self, rating: u8) -> Result<u8>;
    fn rating(&self) -> u8;
    fn xp(&self) -> XpTotals;
    fn summary(&self) -> Option<ProfileSummary>;
    fn owner_display_name(&self) -> String;
}

#[derive(Default)]
struct ProfileState {
    summary: Option<ProfileSummary>,
    rating: u8,
    xp: XpTotals,
}

impl ProfileState {
    fn apply_summary(&mut self, summary: &ProfileSummary) {
        self.rating = summary.rating.min(MAX_RATING);
        self.xp = summary.xp.clone();
        self.summary = Some(summary.clone());
    }
}

pub struct OwnProfile {
    owner: MemberId,
    fetcher: RemoteFetcher,
    state: Mutex<ProfileState>,
    notifier: Notifier,
}

impl OwnProfile {
    pub fn new(owner: MemberId, fetcher: RemoteFetcher, notifier: Notifier) -> Self {
        Self {
            owner,
            fetcher,
            state: Mutex::new(ProfileState::default()),
            notifier,
        }
    }

    /// Compute and store the new rating under one lock, then notify if it
    /// moved.
    fn update_rating(&self, update: impl FnOnce(u8) -> u8) -> u8 {
        let (rating, changed) = {
            let mut state = self.state.lock();
            let rating = update(state.rating).min(MAX_RATING);
            let changed = state.rating != rating;
            state.rating = rating;
            (rating, changed)
        };
        if changed {
            self.notifier.notify_listeners(EventType::RatingChanged);
        }
        rating
    }
}

#[async_trait]
impl ProfileSource for OwnProfile {
    async fn load_profile(&self) -> Result<ProfileSummary> {
        let summary = self
            .fetcher
            .fetch::<One<ProfileSummary>>(Value::Null, "/spirit/me", RequestType::Get)
            .await?;
        self.state.lock().apply_summary(&summary);
        self.notifier.notify_listeners(EventType::ProfileUpdated);
        Ok(summary)
    }

    async fn refresh_xp(&self) -> Result<XpTotals> {
        let xp = self
            .fetcher
            .fetch::<One<XpTotals>>(Value::Null, "/spirit/me/xp", RequestType::Get)
            .await?;
        self.state.lock().xp = xp.clone();
        self.notifier.notify_listeners(EventType::XpUpdated);
        Ok(xp)
    }

    fn adjust_rating(&self, delta: i8) -> Result<u8> {
        Ok(self.update_rating(|current| {
            let target = i16::from(current) + i16::from(delta);
            target.clamp(0, i16::from(MAX_RATING)) as u8
        }))
    }

    fn reset_rating(&self, rating: u8) -> Result<u8> {
        Ok(self.update_rating(|_| rating))
    }

    fn rating(&self) -> u8 {
        self.state.lock().rating
    }

    fn xp(&self) -> XpTotals {
        self.state.lock().xp.clone()
    }

    fn summary(&self) -> Option<ProfileSummary> {
        self.state.lock().summary.clone()
    }

    fn owner_display_name(&self) -> String {
        match &self.state.lock().summary {
            Some(summary) => summary.display_name.clone(),
            None => self.owner.to_string(),
        }
    }
}

#[derive(Default)]
struct AltProfileState {
    member: Option<MemberId>,
    display_name: Option<String>,
    loaded: bool,
    profile: ProfileState,
}

/// Read-only profile of a selected team member.
pub struct AltProfile {
    fetcher: RemoteFetcher,
    state: Mutex<AltProfileState>,
    notifier: Notifier,
}

impl AltProfile {
    pub fn new(fetcher: RemoteFetcher, notifier: Notifier) -> Self {
        Self {
            fetcher,
            state: Mutex::new(AltProfileState::default()),
            notifier,
        }
    }

    pub fn set_display_name(&self, name: &str) {
        self.state.lock().display_name = Some(name.to_string());
    }

    fn member(&self) -> Result<MemberId> {
        self.state
            .lock()
            .member
            .clone()
            .ok_or_else(|| ModelError::NoMemberSelected {
                model: self.fetcher.name().clone(),
            })
    }

    fn unsupported(&self, operation: &'static str) -> ModelError {
        ModelError::Unsupported {
            model: self.fetcher.name().clone(),
            operation,
        }
    }
}

#[async_trait]
impl ProfileSource for AltProfile {
    async fn load_profile(&self) -> Result<ProfileSummary> {
        let member = self.member()?;
        let summary = self
            .fetcher
            .fetch::<One<ProfileSummary>>(
                Value::Null,
                format!("/spirit/{}", member.path_segment()),
                RequestType::Get,
            )
            .await?;
        {
            let mut state = self.state.lock();
            if state.member.as_ref() != Some(&member) {
                debug!(member = %member, "selection moved on, dropping profile");
                return Ok(summary);
            }
            state.profile.apply_summary(&summary);
            state.loaded = true;
        }
        self.notifier.notify_listeners(EventType::ProfileUpdated);
        Ok(summary)
    }

    async fn refresh_xp(&self) -> Result<XpTotals> {
        let member = self.member()?;
        let xp = self
            .fetcher
            .fetch::<One<XpTotals>>(
                Value::Null,
                format!("/spirit/{}/xp", member.path_segment()),
                RequestType::Get,
            )
            .await?;
        {
            let mut state = self.state.lock();
            if state.member.as_ref() != Some(&member) {
                debug!(member = %member, "selection moved on, dropping xp");
                return Ok(xp);
            }
            state.profile.xp = xp.clone();
        }
        self.notifier.notify_listeners(EventType::XpUpdated);
        Ok(xp)
    }

    fn adjust_rating(&self, _delta: i8) -> Result<u8> {
        Err(self.unsupported("adjust_rating"))
    }

    fn reset_rating(&self, _rating: u8) -> Result<u8> {
        Err(self.unsupported("reset_rating"))
    }

    fn rating(&self) -> u8 {
        self.state.lock().profile.rating
    }

    fn xp(&self) -> XpTotals {
        self.state.lock().profile.xp.clone()
    }

    fn summary(&self) -> Option<ProfileSummary> {
        self.state.lock().profile.summary.clone()
    }

    fn owner_display_name(&self) -> String {
        let state = self.state.lock();
        if let Some(summary) = &state.profile.summary {
            return summary.display_name.clone();
        }
        match (&state.display_name, &state.member) {
            (Some(name), _) => name.clone(),
            (None, Some(member)) => member.to_string(),
            (None, None) => String::new(),
        }
    }
}

impl AlternateScope for AltProfile {
    fn scope_to(&self, member: &MemberId) {
        *self.state.lock() = AltProfileState {
            member: Some(member.clone()),
            ..AltProfileState::default()
        };
    }

    fn is_member_loaded(&self, member: &MemberId) -> bool {
        let state = self.state.lock();
        state.loaded && state.member.as_ref() == Some(member)
    }

    fn clear(&self) {
        *self.state.lock() = AltProfileState::default();
    }
}

pub struct ProfileModel {
    listeners: Arc<ListenerRegistry>,
    alt: Arc<AltProfile>,
    proxy: DelegationProxy<dyn ProfileSource>,
}

impl ProfileModel {
    pub fn new(owner: MemberId, fetcher: RemoteFetcher, alt_fetcher: RemoteFetcher) -> Self {
        let listeners = Arc::new(ListenerRegistry::new(ModelName::from_raw(PROFILE)));
        let alt_listeners = Arc::new(ListenerRegistry::new(ModelName::from_raw(PROFILE_ALT)));

        let own = Arc::new(OwnProfile::new(
            owner,
            fetcher,
            Notifier::new(Arc::clone(&listeners)),
        ));
        let alt = Arc::new(AltProfile::new(
            alt_fetcher,
            cascade_notification_chains(&listeners, &alt_listeners),
        ));

        let mut proxy = DelegationProxy::new(
            ModelName::from_raw(PROFILE),
            own as Arc<dyn ProfileSource>,
            Arc::clone(&alt) as Arc<dyn ProfileSource>,
            Arc::clone(&alt) as Arc<dyn AlternateScope>,
        );
        proxy
            .configure_delegate_call("load_profile")
            .configure_delegate_call("refresh_xp")
            .configure_no_op("adjust_rating")
            .configure_no_op("reset_rating");

        Self {
            listeners,
            alt,
            proxy,
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

    pub async fn load_profile(&self) -> Result<ProfileSummary> {
        delegated(&self.proxy, "load_profile")?.load_profile().await
    }

    pub async fn refresh_xp(&self) -> Result<XpTotals> {
        delegated(&self.proxy, "refresh_xp")?.refresh_xp().await
    }

    /// Nudge the local user's rating by `delta`, clamped to `0..=MAX_RATING`.
    /// `Ok(None)` when skipped because another member is selected.
    pub fn adjust_rating(&self, delta: i8) -> Result<Option<u8>> {
        match self.proxy.dispatch("adjust_rating")? {
            Some(source) => source.adjust_rating(delta).map(Some),
            None => Ok(None),
        }
    }

    pub fn reset_rating(&self, rating: u8) -> Result<Option<u8>> {
        match self.proxy.dispatch("reset_rating")? {
            Some(source) => source.reset_rating(rating).map(Some),
            None => Ok(None),
        }
    }

    pub fn rating(&self) -> u8 {
        self.proxy.active().rating()
    }

    pub fn xp(&self) -> XpTotals {
        self.proxy.active().xp()
    }

    pub fn summary(&self) -> Option<ProfileSummary> {
        self.proxy.active().summary()
    }

    pub fn owner_display_name(&self) -> String {
        self.proxy.active().owner_display_name()
    }

    pub fn view_member(&self, member: &TeamMember) -> bool {
        let _ = self.proxy.set_member_selection(&member.id);
        self.alt.set_display_name(&member.display_name);
        !self.proxy.is_member_loaded(&member.id)
    }

    pub fn view_self(&self) -> bool {
        let changed = self.proxy.reset_member_selection();
        if changed {
            self.listeners.notify_listeners(EventType::ProfileUpdated);
        }
        changed
    }

    pub fn selected_member(&self) -> Option<MemberId> {
        self.proxy.selected_member()
    }

    /// Selected member whose profile is still missing, if any.
    pub fn unloaded_member(&self) -> Option<MemberId> {
        self.proxy
            .selected_member()
            .filter(|member| !self.proxy.is_member_loaded(member))
    }
}

impl Model for ProfileModel {
    const NAME: &'static str = PROFILE;

    fn create(ctx: &AppContext, owner: &MemberId) -> Self {
        Self::new(owner.clone(), ctx.fetcher(PROFILE), ctx.fetcher(PROFILE_ALT))
    }
}
