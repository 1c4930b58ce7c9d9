//! Applies push events to the store.
//!
//! The [`Reconciler`] is the [`StreamHandler`] of a streaming connection.
//! Each text frame is decoded into a [`StreamEvent`] and applied to the
//! store synchronously, in the same turn it arrives. Every action is an
//! upsert, a delete by id, or a transaction over ids, so duplicate or
//! reordered delivery converges to the same state.

use crate::fetch::FetchFn;
use crate::schema::{any_entity, Schema};
use fedisync_protocol::{FollowRelationshipsUpdate, Marker, StreamEvent};
use fedisync_store::{
    EntitiesTransaction, Entity, EntityKind, ListKey, PageInfo, PageMode, Position, Store,
    StoreResult,
};
use fedisync_stream::{ConnectionInfo, StreamHandler};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the reconciler files what it receives.
#[derive(Clone)]
pub struct ReconcilerConfig {
    /// Id of the signed-in account. Follow updates for anyone else are
    /// ignored.
    pub me: Option<String>,
    /// Timeline list that `update` events are prepended to.
    pub timeline: Option<ListKey>,
    /// List that notifications are prepended to.
    pub notifications_list: ListKey,
    /// List that conversations are prepended to.
    pub conversations_list: ListKey,
    /// List holding the user's filters.
    pub filters_list: ListKey,
    /// Re-fetches the filters after `filters_changed`.
    pub filters: Option<FetchFn>,
    /// Validator for the fetched filters.
    pub filter_schema: Arc<dyn Schema>,
}

impl ReconcilerConfig {
    /// Creates a config with the default list keys and no user.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signed-in account id.
    pub fn with_me(mut self, me: impl Into<String>) -> Self {
        self.me = Some(me.into());
        self
    }

    /// Binds `update` events to a timeline list.
    pub fn with_timeline(mut self, timeline: impl Into<ListKey>) -> Self {
        self.timeline = Some(timeline.into());
        self
    }

    /// Sets the notifications list.
    pub fn with_notifications_list(mut self, key: impl Into<ListKey>) -> Self {
        self.notifications_list = key.into();
        self
    }

    /// Sets the conversations list.
    pub fn with_conversations_list(mut self, key: impl Into<ListKey>) -> Self {
        self.conversations_list = key.into();
        self
    }

    /// Sets the list refreshed filters are stored in.
    pub fn with_filters_list(mut self, key: impl Into<ListKey>) -> Self {
        self.filters_list = key.into();
        self
    }

    /// Sets the fetch run when filters change.
    pub fn with_filters(mut self, fetch: FetchFn) -> Self {
        self.filters = Some(fetch);
        self
    }

    /// Sets the filter validator.
    pub fn with_filter_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.filter_schema = schema;
        self
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            me: None,
            timeline: None,
            notifications_list: ListKey::from("notifications"),
            conversations_list: ListKey::from("conversations"),
            filters_list: ListKey::from("filters"),
            filters: None,
            filter_schema: any_entity(),
        }
    }
}

impl std::fmt::Debug for ReconcilerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilerConfig")
            .field("me", &self.me)
            .field("timeline", &self.timeline)
            .field("notifications_list", &self.notifications_list)
            .field("conversations_list", &self.conversations_list)
            .field("filters_list", &self.filters_list)
            .field("filters", &self.filters.is_some())
            .finish()
    }
}

/// Counters kept by a [`Reconciler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilerStats {
    /// Frames received.
    pub frames: u64,
    /// Events that changed (or re-confirmed) store state.
    pub applied: u64,
    /// Events with nothing to do: unknown names, follow updates for other
    /// users, filter changes without a fetch function.
    pub ignored: u64,
    /// Frames or payloads that failed to decode.
    pub malformed: u64,
}

/// What applying one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The store was updated.
    Applied,
    /// The event carried nothing for this client.
    Ignored,
}

/// Maps push events onto store mutations.
pub struct Reconciler {
    store: Store,
    config: ReconcilerConfig,
    stats: Mutex<ReconcilerStats>,
}

impl Reconciler {
    /// Creates a reconciler writing to `store`.
    pub fn new(store: Store, config: ReconcilerConfig) -> Self {
        Self {
            store,
            config,
            stats: Mutex::new(ReconcilerStats::default()),
        }
    }

    /// Returns the config.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Returns the store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> ReconcilerStats {
        self.stats.lock().clone()
    }

    /// Decodes and applies one text frame. Malformed frames are logged and
    /// counted, never returned.
    pub fn handle_frame(&self, text: &str) {
        self.stats.lock().frames += 1;
        let event = match StreamEvent::parse(text) {
            Ok(event) => event,
            Err(error) => {
                warn!(%error, "dropping malformed stream frame");
                self.stats.lock().malformed += 1;
                return;
            }
        };

        let name = event.name().to_string();
        match self.apply(event) {
            Ok(ApplyOutcome::Applied) => self.stats.lock().applied += 1,
            Ok(ApplyOutcome::Ignored) => self.stats.lock().ignored += 1,
            Err(error) => {
                warn!(event = %name, %error, "dropping invalid event payload");
                self.stats.lock().malformed += 1;
            }
        }
    }

    /// Applies one decoded event to the store.
    pub fn apply(&self, event: StreamEvent) -> StoreResult<ApplyOutcome> {
        match event {
            StreamEvent::Update(status) => {
                let status = Entity::from_value(status)?;
                debug!(id = %status.id(), timeline = ?self.config.timeline, "status update");
                self.store.import_entities(
                    [status],
                    EntityKind::STATUSES,
                    self.config.timeline.as_ref(),
                    Position::Start,
                );
            }
            StreamEvent::StatusUpdate(status) => {
                let status = Entity::from_value(status)?;
                self.store
                    .import_entities([status], EntityKind::STATUSES, None, Position::End);
            }
            StreamEvent::Delete(id) => {
                if self.store.delete_entity(&EntityKind::STATUSES, &id).is_none() {
                    debug!(%id, "deleted status was not cached");
                }
            }
            StreamEvent::Notification(notification) => {
                let (accounts, status) = embedded(&notification)?;
                let notification = Entity::from_value(notification)?;
                self.store
                    .import_entities(accounts, EntityKind::ACCOUNTS, None, Position::End);
                if let Some(status) = status {
                    self.store
                        .import_entities([status], EntityKind::STATUSES, None, Position::End);
                }
                self.store.import_entities(
                    [notification],
                    EntityKind::NOTIFICATIONS,
                    Some(&self.config.notifications_list),
                    Position::Start,
                );
            }
            StreamEvent::Conversation(conversation) => {
                let conversation = Entity::from_value(conversation)?;
                self.store.import_entities(
                    [conversation],
                    EntityKind::CONVERSATIONS,
                    Some(&self.config.conversations_list),
                    Position::Start,
                );
            }
            StreamEvent::Announcement(announcement) => {
                let announcement = Entity::from_value(announcement)?;
                self.store.import_entities(
                    [announcement],
                    EntityKind::ANNOUNCEMENTS,
                    None,
                    Position::End,
                );
            }
            StreamEvent::AnnouncementDelete(id) => {
                self.store.delete_entity(&EntityKind::ANNOUNCEMENTS, &id);
            }
            StreamEvent::ChatUpdate(chat) => {
                let chat = Entity::from_value(chat)?;
                self.store
                    .import_entities([chat], EntityKind::CHATS, None, Position::End);
            }
            StreamEvent::FiltersChanged => return Ok(self.refetch_filters()),
            StreamEvent::FollowRelationshipsUpdate(update) => {
                return Ok(self.update_follow_relationships(&update));
            }
            StreamEvent::Marker(markers) => self.import_markers(markers)?,
            StreamEvent::Unknown(name) => {
                debug!(event = %name, "ignoring unhandled stream event");
                return Ok(ApplyOutcome::Ignored);
            }
        }
        Ok(ApplyOutcome::Applied)
    }

    fn import_markers(&self, markers: BTreeMap<String, Marker>) -> StoreResult<()> {
        let entities = markers
            .into_iter()
            .map(|(timeline, marker)| {
                Entity::from_value(json!({
                    "id": timeline,
                    "last_read_id": marker.last_read_id,
                    "version": marker.version,
                    "updated_at": marker.updated_at,
                }))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        self.store
            .import_entities(entities, EntityKind::MARKERS, None, Position::End);
        Ok(())
    }

    /// Patches the relationship and both accounts' counters when the user
    /// is the follower.
    fn update_follow_relationships(&self, update: &FollowRelationshipsUpdate) -> ApplyOutcome {
        if self.config.me.as_deref() != Some(update.follower.id.as_str()) {
            debug!(follower = %update.follower.id, "follow update for another account");
            return ApplyOutcome::Ignored;
        }

        let mut txn = EntitiesTransaction::new();
        if let Some((following, requested)) = update.state.relationship_flags() {
            txn.push(
                EntityKind::RELATIONSHIPS,
                update.following.id.as_str(),
                move |relationship| {
                    relationship.patched(|body| {
                        body.insert("following".into(), Value::Bool(following));
                        body.insert("requested".into(), Value::Bool(requested));
                    })
                },
            );
        }
        for side in [&update.follower, &update.following] {
            let (followers, following) = (side.follower_count, side.following_count);
            if followers.is_none() && following.is_none() {
                continue;
            }
            txn.push(EntityKind::ACCOUNTS, side.id.as_str(), move |account| {
                account.patched(|body| {
                    if let Some(count) = followers {
                        body.insert("followers_count".into(), json!(count));
                    }
                    if let Some(count) = following {
                        body.insert("following_count".into(), json!(count));
                    }
                })
            });
        }

        let applied = self.store.entities_transaction(txn);
        debug!(
            following = %update.following.id,
            state = ?update.state,
            applied,
            "applied follow relationships update"
        );
        ApplyOutcome::Applied
    }

    /// Spawns the filters fetch. Needs a tokio runtime on the current thread.
    fn refetch_filters(&self) -> ApplyOutcome {
        let Some(fetch) = self.config.filters.clone() else {
            debug!("filters changed but no filters fetch is configured");
            return ApplyOutcome::Ignored;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("filters changed outside a tokio runtime, not refetching");
            return ApplyOutcome::Ignored;
        };

        let store = self.store.clone();
        let schema = Arc::clone(&self.config.filter_schema);
        let list_key = self.config.filters_list.clone();
        runtime.spawn(async move {
            let response = match fetch().await {
                Ok(response) => response,
                Err(error) => {
                    warn!(%error, "filters refetch failed");
                    return;
                }
            };
            match schema.parse_many(response.data) {
                Ok(filters) => {
                    info!(count = filters.len(), "filters refreshed");
                    store.import_list_page(
                        EntityKind::FILTERS,
                        &list_key,
                        filters,
                        &PageInfo::default(),
                        PageMode::Replace,
                    );
                }
                Err(error) => warn!(%error, "refetched filters failed validation"),
            }
        });
        ApplyOutcome::Applied
    }
}

impl StreamHandler for Reconciler {
    fn on_connect(&self) {
        info!(timeline = ?self.config.timeline, "reconciler attached to stream");
    }

    fn on_disconnect(&self) {
        info!(stats = ?self.stats(), "reconciler detached from stream");
    }

    fn on_receive(&self, connection: &ConnectionInfo, message: &str) {
        debug!(topic = %connection.topic, len = message.len(), "frame received");
        self.handle_frame(message);
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Decodes the accounts and status a notification embeds.
fn embedded(notification: &Value) -> StoreResult<(Vec<Entity>, Option<Entity>)> {
    let object = |field: &str| notification.get(field).filter(|v| v.is_object()).cloned();
    let accounts = ["account", "target"]
        .into_iter()
        .filter_map(|field| object(field))
        .map(Entity::from_value)
        .collect::<StoreResult<Vec<_>>>()?;
    let status = object("status").map(Entity::from_value).transpose()?;
    Ok((accounts, status))
}
