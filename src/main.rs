//! # hearth
//!
//! Runs the client models against an in-process mock host and prints what
//! they hold.

#![deny(unsafe_code)]

mod demo;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hearth_core::{EventType, MemberId, NewJournalEntry, SubscriberId};
use hearth_models::ModelCoordinator;
use hearth_settings::HearthSettings;
use hearth_sync::{local_channel, serve_host, AppContext, ListenerGuard};
use hearth_telemetry::{init_telemetry, TelemetryConfig};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "hearth", about = "Hearth client runtime")]
struct Cli {
    /// Settings file (defaults to ~/.hearth/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start every model against a seeded mock host and print their state.
    Demo {
        /// Team member to view after the initial load.
        #[arg(long)]
        member: Option<String>,

        /// Local user id.
        #[arg(long, default_value = "sam")]
        owner: String,

        /// Add a journal entry before printing.
        #[arg(long)]
        add_entry: Option<String>,
    },
    /// Print the effective settings as JSON.
    Config,
}

fn load_settings(path: Option<&PathBuf>) -> Result<HearthSettings> {
    match path {
        Some(path) => hearth_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => hearth_settings::load_settings().context("Failed to load settings"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_ref())?;
    init_telemetry(TelemetryConfig::from_settings(&settings.logging));

    match cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Command::Demo {
            member,
            owner,
            add_entry,
        } => run_demo(settings, MemberId::from_raw(owner), member, add_entry).await,
    }
}

async fn run_demo(
    settings: HearthSettings,
    owner: MemberId,
    member: Option<String>,
    add_entry: Option<String>,
) -> Result<()> {
    let (ui, host) = local_channel(settings.transport.channel_capacity);
    let (ctx, inbound) = AppContext::connect(ui, settings);

    let cancel = CancellationToken::new();
    let server = tokio::spawn(serve_host(
        Arc::new(demo::seeded_host()),
        host.requests,
        Arc::new(host.replies),
        cancel.clone(),
    ));

    let coordinator = ModelCoordinator::start(&ctx, &owner).await?;
    tracing::info!(owner = %owner, "initial load complete");

    if let Some(title) = add_entry {
        let entry = NewJournalEntry {
            title,
            body: String::new(),
            rating: 6,
        };
        coordinator.journal().add_entry(entry).await?;
        // Give the XP refresh triggered by the new entry a moment to land.
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    print_snapshot("self", &coordinator);

    if let Some(member) = member {
        let member = MemberId::from_raw(member);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut guard = ListenerGuard::new(SubscriberId::from_raw("hearth-demo"));
        for (registry, event) in [
            (coordinator.journal().listeners(), EventType::JournalHistoryUpdate),
            (coordinator.profile().listeners(), EventType::ProfileUpdated),
            (coordinator.circle().listeners(), EventType::CircleUpdated),
        ] {
            let tx = tx.clone();
            guard.listen(registry, event, move |n| {
                let _ = tx.send(n.event);
            });
        }

        coordinator
            .team()
            .select_member(&member)
            .with_context(|| format!("Cannot view {member}"))?;

        let mut pending = vec![
            EventType::JournalHistoryUpdate,
            EventType::ProfileUpdated,
            EventType::CircleUpdated,
        ];
        let waited = tokio::time::timeout(Duration::from_secs(2), async {
            while !pending.is_empty() {
                match rx.recv().await {
                    Some(event) => pending.retain(|e| *e != event),
                    None => break,
                }
            }
        })
        .await;
        if waited.is_err() {
            tracing::warn!(member = %member, "member data did not arrive in time");
        }
        drop(guard);

        print_snapshot(member.as_str(), &coordinator);
    }

    coordinator.shutdown();
    cancel.cancel();
    let served = server.await.context("host task failed")?;
    inbound.abort();
    tracing::info!(served, "demo finished");
    Ok(())
}

fn print_snapshot(label: &str, coordinator: &ModelCoordinator) {
    let journal = coordinator.journal();
    let profile = coordinator.profile();
    let circle = coordinator.circle();
    let snapshot = json!({
        "viewing": label,
        "journal": {
            "owner": journal.owner_display_name(),
            "items": journal.all_items(),
            "active": journal.active_item().map(|i| i.id),
        },
        "profile": {
            "owner": profile.owner_display_name(),
            "rating": profile.rating(),
            "xp": profile.xp(),
        },
        "team": coordinator.team().members(),
        "circle": {
            "owner": circle.owner_display_name(),
            "session": circle.session(),
            "timerSeconds": circle.current_timer_value(),
        },
    });
    match serde_json::to_string_pretty(&snapshot) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::warn!(error = %e, "failed to render snapshot"),
    }
}
