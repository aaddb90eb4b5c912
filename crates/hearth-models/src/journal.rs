//! Journal feed for the local user, or for a selected team member.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::{
    EventType, JournalItem, MemberId, ModelName, NewJournalEntry, Notification, RequestType,
    SubscriberId, TeamMember,
};
use hearth_sync::{
    cascade_notification_chains, AlternateScope, AppContext, ChannelError, DelegationProxy,
    FetchError, List, ListenerRegistry, Model, Notifier, One, RemoteFetcher,
};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ModelError, Result};
use crate::support::delegated;

pub const JOURNAL: &str = "journal";
pub const JOURNAL_ALT: &str = "journal-alt";

#[async_trait]
pub trait JournalSource: Send + Sync {
    async fn load_default_feed(&self) -> Result<Vec<JournalItem>>;
    async fn add_entry(&self, entry: NewJournalEntry) -> Result<JournalItem>;
    fn set_active_item(&self, id: u64) -> bool;
    fn all_items(&self) -> Vec<JournalItem>;
    fn active_item(&self) -> Option<JournalItem>;
    fn owner_display_name(&self) -> String;
}

#[derive(Default)]
struct Feed {
    items: Vec<JournalItem>,
    active: Option<u64>,
}

impl Feed {
    /// Keep the active item if it survived the reload, else fall back to the
    /// newest one.
    fn replace(&mut self, items: Vec<JournalItem>) {
        let kept = self.active.filter(|id| items.iter().any(|i| i.id == *id));
        self.active = kept.or_else(|| items.first().map(|i| i.id));
        self.items = items;
    }

    fn select(&mut self, id: u64) -> bool {
        if self.active == Some(id) || !self.items.iter().any(|i| i.id == id) {
            return false;
        }
        self.active = Some(id);
        true
    }

    fn active_item(&self) -> Option<JournalItem> {
        let id = self.active?;
        self.items.iter().find(|i| i.id == id).cloned()
    }
}

pub struct OwnJournal {
    owner: MemberId,
    fetcher: RemoteFetcher,
    feed: Mutex<Feed>,
    notifier: Notifier,
}

impl OwnJournal {
    pub fn new(owner: MemberId, fetcher: RemoteFetcher, notifier: Notifier) -> Self {
        Self {
            owner,
            fetcher,
            feed: Mutex::new(Feed::default()),
            notifier,
        }
    }
}

#[async_trait]
impl JournalSource for OwnJournal {
    async fn load_default_feed(&self) -> Result<Vec<JournalItem>> {
        let items = self
            .fetcher
            .fetch::<List<JournalItem>>(Value::Null, "/journal/me", RequestType::Get)
            .await?;
        self.feed.lock().replace(items.clone());
        self.notifier.notify_listeners(EventType::JournalHistoryUpdate);
        Ok(items)
    }

    async fn add_entry(&self, entry: NewJournalEntry) -> Result<JournalItem> {
        let payload = serde_json::to_value(&entry)
            .map_err(|e| FetchError::from(ChannelError::Encode(e.to_string())))?;
        let item = self
            .fetcher
            .fetch::<One<JournalItem>>(payload, "/journal/me", RequestType::Post)
            .await?;
        self.notifier.notify_listeners(EventType::JournalNewEntry);

        if let Err(e) = self.load_default_feed().await {
            warn!(owner = %self.owner, error = %e, "journal reload after new entry failed");
        }
        Ok(item)
    }

    fn set_active_item(&self, id: u64) -> bool {
        let changed = self.feed.lock().select(id);
        if changed {
            self.notifier.notify_listeners(EventType::JournalActiveItemChanged);
        }
        changed
    }

    fn all_items(&self) -> Vec<JournalItem> {
        self.feed.lock().items.clone()
    }

    fn active_item(&self) -> Option<JournalItem> {
        self.feed.lock().active_item()
    }

    fn owner_display_name(&self) -> String {
        self.owner.to_string()
    }
}

#[derive(Default)]
struct AltFeed {
    member: Option<MemberId>,
    display_name: Option<String>,
    loaded: bool,
    feed: Feed,
}

/// Read-only journal for a selected team member.
pub struct AltJournal {
    fetcher: RemoteFetcher,
    state: Mutex<AltFeed>,
    notifier: Notifier,
}

impl AltJournal {
    pub fn new(fetcher: RemoteFetcher, notifier: Notifier) -> Self {
        Self {
            fetcher,
            state: Mutex::new(AltFeed::default()),
            notifier,
        }
    }

    pub fn set_display_name(&self, name: &str) {
        self.state.lock().display_name = Some(name.to_string());
    }

    pub fn member(&self) -> Option<MemberId> {
        self.state.lock().member.clone()
    }
}

#[async_trait]
impl JournalSource for AltJournal {
    async fn load_default_feed(&self) -> Result<Vec<JournalItem>> {
        let member = self.member().ok_or_else(|| ModelError::NoMemberSelected {
            model: self.fetcher.name().clone(),
        })?;
        let items = self
            .fetcher
            .fetch::<List<JournalItem>>(
                Value::Null,
                format!("/journal/{}", member.path_segment()),
                RequestType::Get,
            )
            .await?;

        {
            let mut state = self.state.lock();
            if state.member.as_ref() != Some(&member) {
                debug!(member = %member, "selection moved on, dropping journal feed");
                return Ok(items);
            }
            state.feed.replace(items.clone());
            state.loaded = true;
        }
        self.notifier.notify_listeners(EventType::JournalHistoryUpdate);
        Ok(items)
    }

    async fn add_entry(&self, _entry: NewJournalEntry) -> Result<JournalItem> {
        Err(ModelError::Unsupported {
            model: self.fetcher.name().clone(),
            operation: "add_entry",
        })
    }

    fn set_active_item(&self, id: u64) -> bool {
        let changed = self.state.lock().feed.select(id);
        if changed {
            self.notifier.notify_listeners(EventType::JournalActiveItemChanged);
        }
        changed
    }

    fn all_items(&self) -> Vec<JournalItem> {
        self.state.lock().feed.items.clone()
    }

    fn active_item(&self) -> Option<JournalItem> {
        self.state.lock().feed.active_item()
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

impl AlternateScope for AltJournal {
    fn scope_to(&self, member: &MemberId) {
        *self.state.lock() = AltFeed {
            member: Some(member.clone()),
            ..AltFeed::default()
        };
    }

    fn is_member_loaded(&self, member: &MemberId) -> bool {
        let state = self.state.lock();
        state.loaded && state.member.as_ref() == Some(member)
    }

    fn clear(&self) {
        *self.state.lock() = AltFeed::default();
    }
}

/// The journal model UI components talk to. Reads and loads follow the
/// selected team member; adding entries only works on the local user's
/// journal and is skipped while someone else is selected.
pub struct JournalModel {
    listeners: Arc<ListenerRegistry>,
    alt: Arc<AltJournal>,
    proxy: DelegationProxy<dyn JournalSource>,
}

impl JournalModel {
    pub fn new(owner: MemberId, fetcher: RemoteFetcher, alt_fetcher: RemoteFetcher) -> Self {
        let listeners = Arc::new(ListenerRegistry::new(ModelName::from_raw(JOURNAL)));
        let alt_listeners = Arc::new(ListenerRegistry::new(ModelName::from_raw(JOURNAL_ALT)));

        let own = Arc::new(OwnJournal::new(
            owner,
            fetcher,
            Notifier::new(Arc::clone(&listeners)),
        ));
        let alt = Arc::new(AltJournal::new(
            alt_fetcher,
            cascade_notification_chains(&listeners, &alt_listeners),
        ));

        let mut proxy = DelegationProxy::new(
            ModelName::from_raw(JOURNAL),
            own as Arc<dyn JournalSource>,
            Arc::clone(&alt) as Arc<dyn JournalSource>,
            Arc::clone(&alt) as Arc<dyn AlternateScope>,
        );
        proxy
            .configure_delegate_call("load_default_feed")
            .configure_delegate_call("set_active_item")
            .configure_no_op("add_entry");

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

    pub async fn load_default_feed(&self) -> Result<Vec<JournalItem>> {
        delegated(&self.proxy, "load_default_feed")?
            .load_default_feed()
            .await
    }

    /// `Ok(None)` when skipped because another member is selected.
    pub async fn add_entry(&self, entry: NewJournalEntry) -> Result<Option<JournalItem>> {
        match self.proxy.dispatch("add_entry")? {
            Some(source) => source.add_entry(entry).await.map(Some),
            None => Ok(None),
        }
    }

    pub fn set_active_item(&self, id: u64) -> Result<bool> {
        Ok(delegated(&self.proxy, "set_active_item")?.set_active_item(id))
    }

    pub fn all_items(&self) -> Vec<JournalItem> {
        self.proxy.active().all_items()
    }

    pub fn active_item(&self) -> Option<JournalItem> {
        self.proxy.active().active_item()
    }

    pub fn owner_display_name(&self) -> String {
        self.proxy.active().owner_display_name()
    }

    /// Switch to `member`'s journal. Returns `true` when the feed still has
    /// to be loaded for them.
    pub fn view_member(&self, member: &TeamMember) -> bool {
        let _ = self.proxy.set_member_selection(&member.id);
        self.alt.set_display_name(&member.display_name);
        !self.proxy.is_member_loaded(&member.id)
    }

    /// Switch back to the local user's journal.
    pub fn view_self(&self) -> bool {
        let changed = self.proxy.reset_member_selection();
        if changed {
            self.listeners.notify_listeners(EventType::JournalHistoryUpdate);
        }
        changed
    }

    pub fn selected_member(&self) -> Option<MemberId> {
        self.proxy.selected_member()
    }

    /// The selected member while their feed has not landed yet.
    pub fn unloaded_member(&self) -> Option<MemberId> {
        self.proxy
            .selected_member()
            .filter(|member| !self.proxy.is_member_loaded(member))
    }
}

impl Model for JournalModel {
    const NAME: &'static str = JOURNAL;

    fn create(ctx: &AppContext, owner: &MemberId) -> Self {
        Self::new(owner.clone(), ctx.fetcher(JOURNAL), ctx.fetcher(JOURNAL_ALT))
    }
}
