//! Watch command implementation.

use super::report::{print_store, ChangeLine, ReconcileSummary, StoreSummary};
use fedisync_client::{any_entity, fetch_fn, Reconciler, ReconcilerConfig, RestClient};
use fedisync_protocol::Topic;
use fedisync_store::{Entity, EntityId, EntityKind, ListKey, Position, Store, StoreEvent};
use fedisync_stream::{
    poll_fn, ConnectionState, PollFn, StreamConfig, StreamManager, Subscription,
    WebSocketTransport,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const FILTERS_PATH: &str = "/api/v1/filters";
const REPORT_INTERVAL: Duration = Duration::from_millis(250);

/// Failures that end a watch.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The connection gave up.
    #[error("stream closed after {attempts} failed attempts: {last_error}")]
    Closed {
        /// Failed connection attempts.
        attempts: u64,
        /// Last connection error.
        last_error: String,
    },
}

/// Options of the watch command.
#[derive(Debug)]
pub struct WatchOptions {
    /// Server base URL.
    pub base_url: String,
    /// Access token.
    pub token: Option<String>,
    /// Subscribed topic.
    pub topic: Topic,
    /// Signed-in account id.
    pub me: Option<String>,
    /// REST path polled while the stream is down.
    pub poll_url: Option<String>,
    /// Stop after this long.
    pub duration: Option<Duration>,
    /// Print JSON lines instead of text.
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct WatchSummary {
    topic: String,
    state: String,
    connects: u64,
    reconnects: u64,
    polls: u64,
    reconciled: ReconcileSummary,
    store: StoreSummary,
}

/// Runs the watch command until interrupted or the duration elapses.
///
/// Without a poll URL, a connection that closes for good also ends the
/// watch, with an error.
pub async fn run(options: WatchOptions) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::new();
    let timeline = ListKey::new(options.topic.to_string());

    let mut rest = RestClient::new(&options.base_url)?;
    if let Some(token) = &options.token {
        rest = rest.with_token(token.clone());
    }

    let mut config = ReconcilerConfig::new().with_timeline(timeline.clone());
    if let Some(me) = &options.me {
        config = config.with_me(me.clone());
    }
    if options.token.is_some() {
        let rest = rest.clone();
        config = config.with_filters(fetch_fn(move || {
            let rest = rest.clone();
            async move { rest.get(FILTERS_PATH).await }
        }));
    }
    let reconciler = Arc::new(Reconciler::new(store.clone(), config));

    let polling = options
        .poll_url
        .clone()
        .map(|path| timeline_poller(rest.clone(), path, store.clone(), timeline.clone()));

    let manager = StreamManager::new(StreamConfig::new(&options.base_url), WebSocketTransport::new());
    let mut subscription = Subscription::new(options.topic.clone(), reconciler.clone());
    if let Some(token) = &options.token {
        subscription = subscription.with_credential(token.clone());
    }

    info!(topic = %options.topic, base_url = %options.base_url, "watching");
    let changes = store.subscribe();
    let handle = manager.connect(subscription, polling);

    let deadline = async {
        match options.duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let mut report = tokio::time::interval(REPORT_INTERVAL);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            () = &mut deadline => break,
            // Polling keeps the timeline fresh after the stream gives up.
            () = handle.closed(), if options.poll_url.is_none() => break,
            _ = report.tick() => print_changes(&changes, options.json),
        }
    }

    let state = handle.state();
    handle.disconnect();
    print_changes(&changes, options.json);

    let stats = handle.stats();
    let summary = WatchSummary {
        topic: options.topic.to_string(),
        state: state.to_string(),
        connects: stats.connects,
        reconnects: stats.reconnects,
        polls: stats.polls,
        reconciled: ReconcileSummary::from(&reconciler.stats()),
        store: StoreSummary::from(&store.stats()),
    };
    if options.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        print_summary(&summary);
    }

    if state == ConnectionState::Closed && options.poll_url.is_none() {
        return Err(WatchError::Closed {
            attempts: stats.failed_attempts,
            last_error: stats.last_error.unwrap_or_default(),
        }
        .into());
    }
    Ok(())
}

/// Polls `path` and prepends the result to the timeline list.
fn timeline_poller(rest: RestClient, path: String, store: Store, timeline: ListKey) -> PollFn {
    poll_fn(move || {
        let rest = rest.clone();
        let path = path.clone();
        let store = store.clone();
        let timeline = timeline.clone();
        async move {
            let response = match rest.get(&path).await {
                Ok(response) => response,
                Err(error) => {
                    warn!(%path, %error, "fallback poll failed");
                    return;
                }
            };
            match any_entity().parse_many(response.data) {
                Ok(statuses) => {
                    let newer = splice_poll_page(&store, &timeline, statuses);
                    info!(newer, "fallback poll imported statuses");
                }
                Err(error) => warn!(%path, %error, "fallback poll returned invalid statuses"),
            }
        }
    })
}

/// Splices a newest-first page into the timeline. Returns how many
/// statuses were prepended.
///
/// Only the statuses before the first one already in the timeline go to the
/// top. The rest refresh the cache without moving. A page that does not
/// reach the timeline is separated from it by a gap.
fn splice_poll_page(store: &Store, timeline: &ListKey, mut statuses: Vec<Entity>) -> usize {
    if statuses.is_empty() {
        return 0;
    }
    let known: HashSet<EntityId> = store
        .select_list(&EntityKind::STATUSES, timeline)
        .map(|list| list.ids().cloned().collect())
        .unwrap_or_default();

    let older = match statuses.iter().position(|s| known.contains(s.id())) {
        Some(at) => statuses.split_off(at),
        None => {
            if !known.is_empty() {
                store.insert_gap(&EntityKind::STATUSES, timeline, Position::Start);
            }
            Vec::new()
        }
    };
    let newer = statuses.len();
    if newer > 0 {
        store.import_entities(statuses, EntityKind::STATUSES, Some(timeline), Position::Start);
    }
    store.import_entities(older, EntityKind::STATUSES, None, Position::End);
    newer
}

fn print_changes(changes: &Receiver<StoreEvent>, json: bool) {
    for event in changes.try_iter() {
        let line = ChangeLine::from(&event);
        if json {
            match serde_json::to_string(&line) {
                Ok(text) => println!("{text}"),
                Err(error) => warn!(%error, "cannot encode change"),
            }
        } else {
            line.print_text();
        }
    }
}

fn print_summary(summary: &WatchSummary) {
    println!();
    println!("Topic: {}", summary.topic);
    println!("Final state: {}", summary.state);
    println!(
        "Connects: {}  reconnects: {}  polls: {}",
        summary.connects, summary.reconnects, summary.polls
    );
    println!(
        "Frames: {}  applied: {}  ignored: {}  malformed: {}",
        summary.reconciled.frames,
        summary.reconciled.applied,
        summary.reconciled.ignored,
        summary.reconciled.malformed
    );
    print_store(&summary.store);
}
