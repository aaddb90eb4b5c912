//! Active circle session and its running timer.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::{
    CircleSession, EventType, MemberId, ModelName, Notification, RequestType, SubscriberId,
    TeamMember,
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

pub const CIRCLE: &str = "circle";
pub const CIRCLE_ALT: &str = "circle-alt";

#[async_trait]
pub trait CircleSource: Send + Sync {
    /// `None` when the owner is not in a session.
    async fn load_active_session(&self) -> Result<Option<CircleSession>>;
    fn session(&self) -> Option<CircleSession>;
    fn owner_display_name(&self) -> String;

    /// Active seconds in the current session at `now`, or zero.
    fn timer_value_at(&self, now: DateTime<Utc>) -> u64 {
        self.session().map_or(0, |s| s.timer_value_at(now))
    }
}

pub struct OwnCircle {
    owner: MemberId,
    fetcher: RemoteFetcher,
    session: Mutex<Option<CircleSession>>,
    notifier: Notifier,
}

impl OwnCircle {
    pub fn new(owner: MemberId, fetcher: RemoteFetcher, notifier: Notifier) -> Self {
        Self {
            owner,
            fetcher,
            session: Mutex::new(None),
            notifier,
        }
    }
}

#[async_trait]
impl CircleSource for OwnCircle {
    async fn load_active_session(&self) -> Result<Option<CircleSession>> {
        let session = self
            .fetcher
            .fetch::<One<Option<CircleSession>>>(Value::Null, "/circle/me/active", RequestType::Get)
            .await?;
        *self.session.lock() = session.clone();
        self.notifier.notify_listeners(EventType::CircleUpdated);
        Ok(session)
    }

    fn session(&self) -> Option<CircleSession> {
        self.session.lock().clone()
    }

    fn owner_display_name(&self) -> String {
        self.owner.to_string()
    }
}

#[derive(Default)]
struct AltSession {
    member: Option<MemberId>,
    display_name: Option<String>,
    loaded: bool,
    session: Option<CircleSession>,
}

/// Active session of a selected team member.
pub struct AltCircle {
    fetcher: RemoteFetcher,
    state: Mutex<AltSession>,
    notifier: Notifier,
}

impl AltCircle {
    pub fn new(fetcher: RemoteFetcher, notifier: Notifier) -> Self {
        Self {
            fetcher,
            state: Mutex::new(AltSession::default()),
            notifier,
        }
    }

    pub fn set_display_name(&self, name: &str) {
        self.state.lock().display_name = Some(name.to_string());
    }
}

#[async_trait]
impl CircleSource for AltCircle {
    async fn load_active_session(&self) -> Result<Option<CircleSession>> {
        let member = self
            .state
            .lock()
            .member
            .clone()
            .ok_or_else(|| ModelError::NoMemberSelected {
                model: self.fetcher.name().clone(),
            })?;
        let session = self
            .fetcher
            .fetch::<One<Option<CircleSession>>>(
                Value::Null,
                format!("/circle/{}/active", member.path_segment()),
                RequestType::Get,
            )
            .await?;
        {
            let mut state = self.state.lock();
            if state.member.as_ref() != Some(&member) {
                debug!(member = %member, "selection moved on, dropping circle session");
                return Ok(session);
            }
            state.session = session.clone();
            state.loaded = true;
        }
        self.notifier.notify_listeners(EventType::CircleUpdated);
        Ok(session)
    }

    fn session(&self) -> Option<CircleSession> {
        self.state.lock().session.clone()
    }

    fn owner_display_name(&self) -> String {
        let state = self.state.lock();
        match (&state.display_name, &state.member) {
            (Some(name), _) => name.clone(),
            (None, Some(member)) => member.to_string(),
            (None, None) => String::new(),
        }
    }
}

impl AlternateScope for AltCircle {
    fn scope_to(&self, member: &MemberId) {
        *self.state.lock() = AltSession {
            member: Some(member.clone()),
            ..AltSession::default()
        };
    }

    fn is_member_loaded(&self, member: &MemberId) -> bool {
        let state = self.state.lock();
        state.loaded && state.member.as_ref() == Some(member)
    }

    fn clear(&self) {
        *self.state.lock() = AltSession::default();
    }
}

pub struct CircleModel {
    listeners: Arc<ListenerRegistry>,
    alt: Arc<AltCircle>,
    proxy: DelegationProxy<dyn CircleSource>,
}

impl CircleModel {
    pub fn new(owner: MemberId, fetcher: RemoteFetcher, alt_fetcher: RemoteFetcher) -> Self {
        let listeners = Arc::new(ListenerRegistry::new(ModelName::from_raw(CIRCLE)));
        let alt_listeners = Arc::new(ListenerRegistry::new(ModelName::from_raw(CIRCLE_ALT)));

        let own = Arc::new(OwnCircle::new(
            owner,
            fetcher,
            Notifier::new(Arc::clone(&listeners)),
        ));
        let alt = Arc::new(AltCircle::new(
            alt_fetcher,
            cascade_notification_chains(&listeners, &alt_listeners),
        ));

        let mut proxy = DelegationProxy::new(
            ModelName::from_raw(CIRCLE),
            own as Arc<dyn CircleSource>,
            Arc::clone(&alt) as Arc<dyn CircleSource>,
            Arc::clone(&alt) as Arc<dyn AlternateScope>,
        );
        proxy.configure_delegate_call("load_active_session");

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

    pub async fn load_active_session(&self) -> Result<Option<CircleSession>> {
        delegated(&self.proxy, "load_active_session")?
            .load_active_session()
            .await
    }

    pub fn session(&self) -> Option<CircleSession> {
        self.proxy.active().session()
    }

    /// Seconds since the session started, minus paused time. Zero with no
    /// session.
    pub fn current_timer_value(&self) -> u64 {
        self.current_timer_value_at(Utc::now())
    }

    pub fn current_timer_value_at(&self, now: DateTime<Utc>) -> u64 {
        self.proxy.active().timer_value_at(now)
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
            self.listeners.notify_listeners(EventType::CircleUpdated);
        }
        changed
    }

    pub fn selected_member(&self) -> Option<MemberId> {
        self.proxy.selected_member()
    }

    pub fn unloaded_member(&self) -> Option<MemberId> {
        self.proxy
            .selected_member()
            .filter(|member| !self.proxy.is_member_loaded(member))
    }
}

impl Model for CircleModel {
    const NAME: &'static str = CIRCLE;

    fn create(ctx: &AppContext, owner: &MemberId) -> Self {
        Self::new(owner.clone(), ctx.fetcher(CIRCLE), ctx.fetcher(CIRCLE_ALT))
    }
}
