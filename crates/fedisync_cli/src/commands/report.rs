//! Serializable summaries shared by the commands.

use fedisync_client::ReconcilerStats;
use fedisync_store::{StoreChange, StoreEvent, StoreStats};
use serde::Serialize;
use std::collections::BTreeMap;

/// One committed store change.
#[derive(Debug, Serialize)]
pub struct ChangeLine {
    /// Commit sequence number.
    pub sequence: u64,
    /// `imported`, `transacted`, `deleted` or `list_updated`.
    pub change: &'static str,
    /// Kind touched, when the change has exactly one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// List touched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    /// `kind/id` of every entity touched.
    pub ids: Vec<String>,
}

impl From<&StoreEvent> for ChangeLine {
    fn from(event: &StoreEvent) -> Self {
        let (change, kind, list, ids) = match &event.change {
            StoreChange::Imported {
                kind,
                ids,
                list_key,
            } => (
                "imported",
                Some(kind.to_string()),
                list_key.as_ref().map(ToString::to_string),
                ids.iter().map(ToString::to_string).collect(),
            ),
            StoreChange::Transacted { entities } => (
                "transacted",
                None,
                None,
                entities
                    .iter()
                    .map(|(kind, id)| format!("{kind}/{id}"))
                    .collect(),
            ),
            StoreChange::Deleted { kind, ids } => (
                "deleted",
                Some(kind.to_string()),
                None,
                ids.iter().map(ToString::to_string).collect(),
            ),
            StoreChange::ListUpdated { kind, list_key } => (
                "list_updated",
                Some(kind.to_string()),
                Some(list_key.to_string()),
                Vec::new(),
            ),
        };
        Self {
            sequence: event.sequence,
            change,
            kind,
            list,
            ids,
        }
    }
}

impl ChangeLine {
    /// Prints the change as one text line.
    pub fn print_text(&self) {
        let mut line = format!("#{} {}", self.sequence, self.change);
        if let Some(kind) = &self.kind {
            line.push(' ');
            line.push_str(kind);
        }
        if let Some(list) = &self.list {
            line.push_str(&format!(" [{list}]"));
        }
        if !self.ids.is_empty() {
            line.push_str(&format!(" {}", self.ids.join(",")));
        }
        println!("{line}");
    }
}

/// Entity and list counts of a store.
#[derive(Debug, Serialize)]
pub struct StoreSummary {
    /// Sequence number of the last change.
    pub sequence: u64,
    /// Entities per kind.
    pub entities: BTreeMap<String, usize>,
    /// Lists per kind.
    pub lists: BTreeMap<String, usize>,
}

impl From<&StoreStats> for StoreSummary {
    fn from(stats: &StoreStats) -> Self {
        Self {
            sequence: stats.sequence,
            entities: stats
                .kinds
                .iter()
                .map(|(kind, k)| (kind.to_string(), k.entities))
                .collect(),
            lists: stats
                .kinds
                .iter()
                .map(|(kind, k)| (kind.to_string(), k.lists))
                .collect(),
        }
    }
}

/// Reconciler counters.
#[derive(Debug, Serialize)]
pub struct ReconcileSummary {
    /// Frames received.
    pub frames: u64,
    /// Events applied.
    pub applied: u64,
    /// Events ignored.
    pub ignored: u64,
    /// Frames that failed to decode.
    pub malformed: u64,
}

impl From<&ReconcilerStats> for ReconcileSummary {
    fn from(stats: &ReconcilerStats) -> Self {
        Self {
            frames: stats.frames,
            applied: stats.applied,
            ignored: stats.ignored,
            malformed: stats.malformed,
        }
    }
}

/// Prints the store summary as text.
pub fn print_store(summary: &StoreSummary) {
    println!("Store sequence: {}", summary.sequence);
    for (kind, count) in &summary.entities {
        let lists = summary.lists.get(kind).copied().unwrap_or(0);
        println!("  {kind:<16} {count:>6} entities {lists:>3} lists");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedisync_store::{EntityId, EntityKind, ListKey};

    #[test]
    fn imported_change_line() {
        let event = StoreEvent {
            sequence: 4,
            change: StoreChange::Imported {
                kind: EntityKind::STATUSES,
                ids: vec![EntityId::from("1"), EntityId::from("2")],
                list_key: Some(ListKey::from("home")),
            },
        };
        let line = ChangeLine::from(&event);
        assert_eq!(line.change, "imported");
        assert_eq!(line.kind.as_deref(), Some("statuses"));
        assert_eq!(line.list.as_deref(), Some("home"));
        assert_eq!(line.ids, vec!["1", "2"]);
    }

    #[test]
    fn transacted_change_line_names_kinds() {
        let event = StoreEvent {
            sequence: 9,
            change: StoreChange::Transacted {
                entities: vec![
                    (EntityKind::RELATIONSHIPS, EntityId::from("42")),
                    (EntityKind::ACCOUNTS, EntityId::from("42")),
                ],
            },
        };
        let line = ChangeLine::from(&event);
        assert_eq!(line.kind, None);
        assert_eq!(line.ids, vec!["relationships/42", "accounts/42"]);
        let json = serde_json::to_value(&line).unwrap();
        assert!(json.get("kind").is_none());
    }
}
