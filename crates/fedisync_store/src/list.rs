//! Ordered entity lists.

use crate::entity::EntityId;
use crate::types::Position;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Pagination and loading state of a list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    /// Cursor for the next (older) page.
    pub next: Option<String>,
    /// Cursor for the previous (newer) page.
    pub prev: Option<String>,
    /// Total item count reported by the server.
    pub total_count: Option<u64>,
    /// A fetch for this list is in flight.
    pub is_loading: bool,
    /// The server returned a deliberately incomplete page.
    pub is_partial: bool,
    /// At least one page has been fetched.
    pub fetched: bool,
    /// When the last page was fetched.
    pub last_fetched_at: Option<Instant>,
    /// The list was invalidated and must be re-fetched.
    pub invalid: bool,
    /// Message of the last failed fetch.
    pub error: Option<String>,
}

impl ListState {
    /// Returns true if there are older pages to fetch.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Returns true if the list must be re-fetched before it can be trusted.
    ///
    /// A list is stale when it was never fetched, was invalidated, holds a
    /// partial page, or was fetched longer than `stale_time` ago.
    #[must_use]
    pub fn is_stale(&self, stale_time: Duration) -> bool {
        if !self.fetched || self.invalid || self.is_partial {
            return true;
        }
        match self.last_fetched_at {
            Some(at) => at.elapsed() >= stale_time,
            None => true,
        }
    }
}

/// Pagination details of one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// Cursor for the page after this one.
    pub next: Option<String>,
    /// Cursor for the page before this one.
    pub prev: Option<String>,
    /// Total count, if the server reports one.
    pub total_count: Option<u64>,
    /// The server flagged the page as partial.
    pub partial: bool,
}

/// How a fetched page is merged into its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// The page replaces the list contents and both cursors.
    Replace,
    /// The page is appended; only `next` is updated.
    Append,
    /// The page is prepended; only `prev` is updated.
    Prepend,
}

/// A named, ordered sequence of entity ids.
///
/// Slots hold `Some(id)` or `None`, the gap sentinel marking an unresolved
/// hole between two known pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityList {
    ids: Vec<Option<EntityId>>,
    state: ListState,
}

impl EntityList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slots, including gaps.
    #[must_use]
    pub fn slots(&self) -> &[Option<EntityId>] {
        &self.ids
    }

    /// Returns the ids in order, skipping gaps.
    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.ids.iter().flatten()
    }

    /// Returns the list state.
    #[must_use]
    pub fn state(&self) -> &ListState {
        &self.state
    }

    /// Number of slots, gaps included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the list has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns true if `id` is in the list.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.ids().any(|existing| existing == id)
    }

    pub(crate) fn state_mut(&mut self) -> &mut ListState {
        &mut self.state
    }

    /// Splices `ids` at `position`, skipping ids already present and
    /// duplicates within `ids`. Returns how many ids were added.
    pub(crate) fn splice(&mut self, ids: &[EntityId], position: Position) -> usize {
        let mut seen: HashSet<&EntityId> = self.ids.iter().flatten().collect();
        let fresh: Vec<Option<EntityId>> = ids
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .map(Some)
            .collect();
        let added = fresh.len();

        match position {
            Position::Start => {
                self.ids.splice(0..0, fresh);
            }
            Position::End => self.ids.extend(fresh),
        }
        added
    }

    /// Replaces all slots with `ids` (deduplicated, order kept).
    pub(crate) fn replace(&mut self, ids: &[EntityId]) {
        self.ids.clear();
        self.splice(ids, Position::End);
    }

    /// Inserts the gap sentinel at `position`, unless one is already there.
    pub(crate) fn insert_gap(&mut self, position: Position) {
        match position {
            Position::Start if !matches!(self.ids.first(), Some(None)) => {
                self.ids.insert(0, None);
            }
            Position::End if !matches!(self.ids.last(), Some(None)) => self.ids.push(None),
            _ => {}
        }
    }

    /// Removes every occurrence of the given ids. Returns how many were removed.
    pub(crate) fn remove(&mut self, ids: &HashSet<&EntityId>) -> usize {
        let before = self.ids.len();
        self.ids
            .retain(|slot| slot.as_ref().map_or(true, |id| !ids.contains(id)));
        let removed = before - self.ids.len();
        if removed > 0 {
            if let Some(total) = self.state.total_count.as_mut() {
                *total = total.saturating_sub(removed as u64);
            }
        }
        removed
    }

    /// Applies a fetched page to the list.
    pub(crate) fn apply_page(&mut self, ids: &[EntityId], page: &PageInfo, mode: PageMode) {
        match mode {
            PageMode::Replace => {
                self.replace(ids);
                self.state.next = page.next.clone();
                self.state.prev = page.prev.clone();
            }
            PageMode::Append => {
                self.splice(ids, Position::End);
                self.state.next = page.next.clone();
            }
            PageMode::Prepend => {
                self.splice(ids, Position::Start);
                self.state.prev = page.prev.clone();
            }
        }

        if page.total_count.is_some() {
            self.state.total_count = page.total_count;
        }
        self.state.is_partial = page.partial;
        self.state.is_loading = false;
        self.state.fetched = true;
        self.state.invalid = false;
        self.state.error = None;
        self.state.last_fetched_at = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<EntityId> {
        raw.iter().map(|s| EntityId::from(*s)).collect()
    }

    fn collect(list: &EntityList) -> Vec<&str> {
        list.ids().map(EntityId::as_str).collect()
    }

    #[test]
    fn splice_end_and_start() {
        let mut list = EntityList::new();
        assert_eq!(list.splice(&ids(&["3", "4"]), Position::End), 2);
        assert_eq!(list.splice(&ids(&["1", "2"]), Position::Start), 2);
        assert_eq!(list.splice(&ids(&["5"]), Position::End), 1);
        assert_eq!(collect(&list), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn splice_skips_existing_and_duplicates() {
        let mut list = EntityList::new();
        list.splice(&ids(&["a", "b"]), Position::End);
        let added = list.splice(&ids(&["c", "a", "c", "d"]), Position::Start);
        assert_eq!(added, 2);
        assert_eq!(collect(&list), vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn gaps_are_not_doubled() {
        let mut list = EntityList::new();
        list.splice(&ids(&["a"]), Position::End);
        list.insert_gap(Position::End);
        list.insert_gap(Position::End);
        list.splice(&ids(&["b"]), Position::End);
        assert_eq!(list.slots().len(), 3);
        assert_eq!(list.slots()[1], None);
        assert_eq!(collect(&list), vec!["a", "b"]);
    }

    #[test]
    fn remove_decrements_total() {
        let mut list = EntityList::new();
        list.splice(&ids(&["a", "b", "c"]), Position::End);
        list.state_mut().total_count = Some(10);

        let a = EntityId::from("a");
        let c = EntityId::from("c");
        let removed = list.remove(&[&a, &c].into_iter().collect());
        assert_eq!(removed, 2);
        assert_eq!(collect(&list), vec!["b"]);
        assert_eq!(list.state().total_count, Some(8));
    }

    #[test]
    fn apply_page_modes() {
        let mut list = EntityList::new();
        let page = PageInfo {
            next: Some("max_id=2".into()),
            prev: Some("min_id=3".into()),
            ..PageInfo::default()
        };
        list.apply_page(&ids(&["3", "2"]), &page, PageMode::Replace);
        assert!(list.state().fetched);
        assert!(list.state().has_more());

        let older = PageInfo {
            next: None,
            prev: Some("ignored".into()),
            ..PageInfo::default()
        };
        list.apply_page(&ids(&["1"]), &older, PageMode::Append);
        assert_eq!(collect(&list), vec!["3", "2", "1"]);
        assert!(!list.state().has_more());
        assert_eq!(list.state().prev.as_deref(), Some("min_id=3"));

        list.apply_page(&ids(&["9"]), &PageInfo::default(), PageMode::Replace);
        assert_eq!(collect(&list), vec!["9"]);
    }

    #[test]
    fn staleness() {
        let mut state = ListState::default();
        assert!(state.is_stale(Duration::from_secs(60)));

        state.fetched = true;
        state.last_fetched_at = Some(Instant::now());
        assert!(!state.is_stale(Duration::from_secs(60)));
        assert!(state.is_stale(Duration::ZERO));

        state.is_partial = true;
        assert!(state.is_stale(Duration::from_secs(60)));

        state.is_partial = false;
        state.invalid = true;
        assert!(state.is_stale(Duration::from_secs(60)));
    }
}
