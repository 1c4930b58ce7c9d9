//! JSON fixtures and stream frame builders.
//!
//! Payloads carry just enough fields for the sync core: ids, the fields the
//! reconciler patches, and the embedded objects it normalizes.

use fedisync_protocol::StreamEvent;
use fedisync_store::{Entity, EntityKind, ListKey, Position, Store};
use serde_json::{json, Value};

/// Wraps a fixture as an entity.
///
/// # Panics
///
/// Panics if `value` is not an object with an id.
pub fn entity(value: Value) -> Entity {
    Entity::from_value(value).expect("fixture must be an object with an id")
}

/// An account.
pub fn account(id: &str, acct: &str) -> Value {
    json!({
        "id": id,
        "acct": acct,
        "username": acct.split('@').next().unwrap_or(acct),
        "followers_count": 0,
        "following_count": 0,
    })
}

/// A status posted by account `1`.
pub fn status(id: &str) -> Value {
    status_by(id, &account("1", "alex"))
}

/// A status posted by `author`.
pub fn status_by(id: &str, author: &Value) -> Value {
    json!({
        "id": id,
        "content": format!("<p>status {id}</p>"),
        "visibility": "public",
        "account": author,
    })
}

/// The user's relationship with account `id`.
pub fn relationship(id: &str, following: bool, requested: bool) -> Value {
    json!({
        "id": id,
        "following": following,
        "requested": requested,
        "followed_by": false,
        "blocking": false,
        "muting": false,
    })
}

/// A notification of `kind` from `from`, optionally about `about`.
pub fn notification(id: &str, kind: &str, from: &Value, about: Option<&Value>) -> Value {
    let mut value = json!({
        "id": id,
        "type": kind,
        "account": from,
    });
    if let Some(status) = about {
        value["status"] = status.clone();
    }
    value
}

/// A direct conversation whose last status is `last`.
pub fn conversation(id: &str, last: &Value) -> Value {
    json!({
        "id": id,
        "unread": true,
        "accounts": [last["account"].clone()],
        "last_status": last,
    })
}

/// Payload of a follow relationships update.
pub fn follow_update(
    state: &str,
    follower: (&str, u64, u64),
    following: (&str, u64, u64),
) -> Value {
    json!({
        "state": state,
        "follower": {
            "id": follower.0,
            "follower_count": follower.1,
            "following_count": follower.2,
        },
        "following": {
            "id": following.0,
            "follower_count": following.1,
            "following_count": following.2,
        },
    })
}

/// A push frame whose payload is `payload`, string encoded.
pub fn frame(event: &str, payload: &Value) -> String {
    json!({"event": event, "payload": payload.to_string()}).to_string()
}

/// A push frame whose payload is sent as is.
pub fn raw_frame(event: &str, payload: &str) -> String {
    json!({"event": event, "payload": payload}).to_string()
}

/// A push frame without payload.
pub fn bare_frame(event: &str) -> String {
    json!({"event": event}).to_string()
}

/// An `update` frame for status `id`.
pub fn update_frame(id: &str) -> String {
    frame(StreamEvent::UPDATE, &status(id))
}

/// A `delete` frame for status `id`.
pub fn delete_frame(id: &str) -> String {
    raw_frame(StreamEvent::DELETE, id)
}

/// Store scenarios.
pub mod scenarios {
    use super::*;

    /// A store whose `timeline` list holds statuses `1..=count`, newest first.
    pub fn timeline_store(timeline: &str, count: usize) -> Store {
        let store = Store::new();
        let statuses: Vec<Entity> = (1..=count)
            .rev()
            .map(|i| entity(status(&i.to_string())))
            .collect();
        store.import_entities(
            statuses,
            EntityKind::STATUSES,
            Some(&ListKey::from(timeline)),
            Position::End,
        );
        store
    }

    /// A store holding account `id` and the user's relationship with it.
    pub fn followable_store(id: &str, acct: &str) -> Store {
        let store = Store::new();
        store.import_entities(
            [entity(account(id, acct))],
            EntityKind::ACCOUNTS,
            None,
            Position::End,
        );
        store.import_entities(
            [entity(relationship(id, false, false))],
            EntityKind::RELATIONSHIPS,
            None,
            Position::End,
        );
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_decode() {
        let event = StreamEvent::parse(&update_frame("7")).unwrap();
        assert!(matches!(event, StreamEvent::Update(ref v) if v["id"] == "7"));

        let event = StreamEvent::parse(&delete_frame("7")).unwrap();
        assert_eq!(event, StreamEvent::Delete("7".into()));

        let event = StreamEvent::parse(&bare_frame("filters_changed")).unwrap();
        assert_eq!(event, StreamEvent::FiltersChanged);
    }

    #[test]
    fn timeline_scenario_is_newest_first() {
        let store = scenarios::timeline_store("home", 3);
        let ids: Vec<String> = store
            .select_list(&EntityKind::STATUSES, &ListKey::from("home"))
            .unwrap()
            .ids()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn notification_embeds_status() {
        let kim = account("5", "kim");
        let value = notification("n1", "favourite", &kim, Some(&status("9")));
        assert_eq!(value["account"]["acct"], "kim");
        assert_eq!(value["status"]["id"], "9");
    }
}
