//! Core type definitions for the store.

use std::borrow::Cow;
use std::fmt;

/// Name of an entity kind (a table in the store).
///
/// Kinds are open-ended strings; the constants cover the kinds the
/// reconciler writes to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKind(Cow<'static, str>);

impl EntityKind {
    /// Statuses (posts).
    pub const STATUSES: EntityKind = EntityKind::from_static("statuses");
    /// Accounts.
    pub const ACCOUNTS: EntityKind = EntityKind::from_static("accounts");
    /// Relationships between the user and another account.
    pub const RELATIONSHIPS: EntityKind = EntityKind::from_static("relationships");
    /// Notifications.
    pub const NOTIFICATIONS: EntityKind = EntityKind::from_static("notifications");
    /// Direct conversations.
    pub const CONVERSATIONS: EntityKind = EntityKind::from_static("conversations");
    /// Instance announcements.
    pub const ANNOUNCEMENTS: EntityKind = EntityKind::from_static("announcements");
    /// Chats.
    pub const CHATS: EntityKind = EntityKind::from_static("chats");
    /// Content filters.
    pub const FILTERS: EntityKind = EntityKind::from_static("filters");
    /// Read markers, keyed by timeline name.
    pub const MARKERS: EntityKind = EntityKind::from_static("markers");

    /// Creates a kind from a static string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Returns the kind name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for EntityKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EntityKind {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of an ordered list within a kind (e.g. one timeline).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListKey(String);

impl ListKey {
    /// Creates a list key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ListKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ListKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where new ids are spliced into a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    /// Before every id already present.
    Start,
    /// After every id already present.
    #[default]
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_compare_by_name() {
        let owned: EntityKind = String::from("statuses").into();
        assert_eq!(owned, EntityKind::STATUSES);
        assert_eq!(EntityKind::from("custom").as_str(), "custom");
        assert_eq!(EntityKind::ACCOUNTS.to_string(), "accounts");
    }

    #[test]
    fn default_position_is_end() {
        assert_eq!(Position::default(), Position::End);
    }
}
