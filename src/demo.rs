//! Seeded host data for `hearth demo`.

use std::time::Duration;

use hearth_core::RequestType;
use hearth_sync::host::mock::MockReply;
use hearth_sync::MockHost;
use serde_json::{json, Value};

fn entry(id: u64, title: &str, rating: u8, at: &str) -> Value {
    json!({ "id": id, "title": title, "body": "", "rating": rating, "createdAt": at })
}

fn spirit(member: &str, name: &str, rating: u8, total: u64, level: u32) -> Value {
    json!({
        "memberId": member,
        "displayName": name,
        "rating": rating,
        "xp": { "total": total, "level": level, "nextLevelAt": (level as u64 + 1) * 250 }
    })
}

/// A host with a small team. Profile replies are slowed down so they land
/// after the journal replies that were sent later.
pub fn seeded_host() -> MockHost {
    let slow = |data: Value| MockReply::delayed(Duration::from_millis(40), MockReply::Data(data));

    MockHost::new()
        .with_data(
            RequestType::Get,
            "/journal/me",
            json!([
                entry(3, "Evening walk", 7, "2026-10-14T18:30:00Z"),
                entry(2, "Slow morning", 4, "2026-10-14T08:10:00Z"),
            ]),
        )
        .with_data(
            RequestType::Post,
            "/journal/me",
            entry(4, "Demo entry", 6, "2026-10-15T09:00:00Z"),
        )
        .with_route(RequestType::Get, "/spirit/me", slow(spirit("me", "Sam", 7, 410, 1)))
        .with_data(
            RequestType::Get,
            "/spirit/me/xp",
            json!({ "total": 430, "level": 1, "nextLevelAt": 500 }),
        )
        .with_data(
            RequestType::Get,
            "/team/me",
            json!([
                { "id": "ana", "displayName": "Ana", "online": true },
                { "id": "ben", "displayName": "Ben", "online": false },
            ]),
        )
        .with_data(
            RequestType::Get,
            "/circle/me/active",
            json!({
                "id": "circle-1",
                "name": "Deep work",
                "startedAt": "2026-10-15T08:00:00Z",
                "pausedSeconds": 300
            }),
        )
        .with_data(
            RequestType::Get,
            "/journal/ana",
            json!([entry(21, "Climbing day", 9, "2026-10-13T15:00:00Z")]),
        )
        .with_route(RequestType::Get, "/spirit/ana", slow(spirit("ana", "Ana", 9, 1320, 5)))
        .with_data(RequestType::Get, "/circle/ana/active", Value::Null)
        .with_data(RequestType::Get, "/journal/ben", json!([]))
        .with_route(RequestType::Get, "/spirit/ben", slow(spirit("ben", "Ben", 3, 90, 0)))
        .with_data(RequestType::Get, "/circle/ben/active", Value::Null)
}
