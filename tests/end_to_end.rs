//! Models talking to a mock host across the in-process channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hearth_core::{EventType, MemberId, RequestType, SubscriberId};
use hearth_models::{JournalModel, ModelCoordinator, ProfileModel};
use hearth_settings::HearthSettings;
use hearth_sync::host::mock::MockReply;
use hearth_sync::{local_channel, serve_host, AppContext, MockHost};
use serde_json::json;
use tokio_util::sync::CancellationToken;

struct Running {
    ctx: Arc<AppContext>,
    host: Arc<MockHost>,
    cancel: CancellationToken,
}

impl Drop for Running {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn start(host: MockHost) -> Running {
    let (ui, host_end) = local_channel(32);
    let (ctx, _inbound) = AppContext::connect(ui, HearthSettings::default());
    let host = Arc::new(host);
    let cancel = CancellationToken::new();
    tokio::spawn(serve_host(
        host.clone(),
        host_end.requests,
        Arc::new(host_end.replies),
        cancel.clone(),
    ));
    Running { ctx, host, cancel }
}

fn me() -> MemberId {
    MemberId::from_raw("me")
}

#[tokio::test]
async fn journal_feed_reaches_subscribed_component() {
    let running = start(MockHost::new().with_data(
        RequestType::Get,
        "/journal/me",
        json!([{
            "id": 7,
            "title": "first light",
            "rating": 6,
            "createdAt": "2026-10-01T06:00:00Z"
        }]),
    ));
    let journal = running.ctx.model::<JournalModel>(&me()).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let component = SubscriberId::from_raw("journal-panel");
    {
        let fired = Arc::clone(&fired);
        journal.register_listener(&component, EventType::JournalHistoryUpdate, move |n| {
            assert_eq!(n.source.as_str(), "journal");
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }

    let items = journal.load_default_feed().await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "first light");
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    let sent = running.host.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].name.as_str(), "journal");
    assert_eq!(sent[0].context.as_str(), "main-window");
    assert!(sent[0].subject_id.as_str().starts_with("req_"));

    assert_eq!(journal.unregister_all_listeners(&component), 1);
    journal.load_default_feed().await.unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn replies_out_of_order_reach_the_right_models() {
    let running = start(
        MockHost::new()
            .with_route(
                RequestType::Get,
                "/journal/me",
                MockReply::delayed(
                    Duration::from_millis(60),
                    MockReply::Data(json!([
                        { "id": 1, "title": "slow", "createdAt": "2026-10-01T06:00:00Z" }
                    ])),
                ),
            )
            .with_data(
                RequestType::Get,
                "/spirit/me",
                json!({ "memberId": "me", "displayName": "Sam", "rating": 4 }),
            ),
    );
    let journal = running.ctx.model::<JournalModel>(&me()).unwrap();
    let profile = running.ctx.model::<ProfileModel>(&me()).unwrap();

    let (items, summary) = tokio::join!(journal.load_default_feed(), profile.load_profile());

    assert_eq!(items.unwrap()[0].title, "slow");
    assert_eq!(summary.unwrap().display_name, "Sam");
    assert_eq!(running.ctx.hub().pending_count(), 0);
}

#[tokio::test]
async fn overlapping_load_is_rejected_without_disturbing_the_first() {
    let running = start(MockHost::new().with_route(
        RequestType::Get,
        "/journal/me",
        MockReply::delayed(Duration::from_millis(30), MockReply::Data(json!([]))),
    ));
    let journal = running.ctx.model::<JournalModel>(&me()).unwrap();

    let (first, second) = tokio::join!(journal.load_default_feed(), async {
        tokio::task::yield_now().await;
        journal.load_default_feed().await
    });

    assert!(first.unwrap().is_empty());
    assert!(second.unwrap_err().is_call_in_progress());
    assert_eq!(running.host.call_count(RequestType::Get, "/journal/me"), 1);
}

#[tokio::test]
async fn coordinator_follows_team_selection() {
    let running = start(
        MockHost::new()
            .with_data(RequestType::Get, "/journal/me", json!([]))
            .with_data(
                RequestType::Get,
                "/spirit/me",
                json!({ "memberId": "me", "displayName": "Sam", "rating": 5 }),
            )
            .with_data(
                RequestType::Get,
                "/team/me",
                json!([{ "id": "ana", "displayName": "Ana", "online": true }]),
            )
            .with_data(RequestType::Get, "/circle/me/active", json!(null))
            .with_data(
                RequestType::Get,
                "/journal/ana",
                json!([
                    { "id": 5, "title": "crag", "rating": 8, "createdAt": "2026-10-02T10:00:00Z" }
                ]),
            )
            .with_data(
                RequestType::Get,
                "/spirit/ana",
                json!({ "memberId": "ana", "displayName": "Ana", "rating": 8 }),
            )
            .with_data(RequestType::Get, "/circle/ana/active", json!(null)),
    );
    let coordinator = ModelCoordinator::start(&running.ctx, &me()).await.unwrap();

    coordinator
        .team()
        .select_member(&MemberId::from_raw("ana"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(coordinator.journal().all_items()[0].title, "crag");
    assert_eq!(coordinator.profile().rating(), 8);
    // Rating writes are skipped while viewing someone else.
    assert_eq!(coordinator.profile().adjust_rating(1).unwrap(), None);

    coordinator.team().clear_selection();
    assert!(coordinator.journal().all_items().is_empty());
    assert_eq!(coordinator.profile().adjust_rating(1).unwrap(), Some(6));

    assert_eq!(coordinator.shutdown(), 4);
}
