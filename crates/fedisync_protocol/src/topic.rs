//! Streaming topics and endpoint URLs.

use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Path of the streaming endpoint, relative to the streaming base URL.
const STREAMING_PATH: &str = "api/streaming/";

/// A server-defined stream a client can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The authenticated user's home timeline and notifications.
    User,
    /// Notifications only.
    UserNotification,
    /// The federated timeline.
    Public,
    /// The local timeline.
    PublicLocal,
    /// Remote statuses only.
    PublicRemote,
    /// A hashtag timeline.
    Hashtag(String),
    /// A hashtag timeline restricted to local statuses.
    HashtagLocal(String),
    /// A user list timeline, by list id.
    List(String),
    /// A group timeline, by group id.
    Group(String),
    /// Direct conversations.
    Direct,
    /// A stream name this crate does not model.
    Other(String),
}

impl Topic {
    /// Returns the value of the `stream` query parameter.
    pub fn stream_name(&self) -> &str {
        match self {
            Topic::User => "user",
            Topic::UserNotification => "user:notification",
            Topic::Public => "public",
            Topic::PublicLocal => "public:local",
            Topic::PublicRemote => "public:remote",
            Topic::Hashtag(_) => "hashtag",
            Topic::HashtagLocal(_) => "hashtag:local",
            Topic::List(_) => "list",
            Topic::Group(_) => "group",
            Topic::Direct => "direct",
            Topic::Other(name) => name,
        }
    }

    /// Returns the extra query parameter the stream requires, if any.
    pub fn param(&self) -> Option<(&'static str, &str)> {
        match self {
            Topic::Hashtag(tag) | Topic::HashtagLocal(tag) => Some(("tag", tag)),
            Topic::List(id) => Some(("list", id)),
            Topic::Group(id) => Some(("group", id)),
            _ => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.param() {
            Some((_, value)) => write!(f, "{}:{}", self.stream_name(), value),
            None => f.write_str(self.stream_name()),
        }
    }
}

impl FromStr for Topic {
    type Err = ProtocolError;

    /// Parses the display form, e.g. `public:local`, `hashtag:rust`,
    /// `hashtag:local:rust`, `list:42` or `group:3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let topic = match s {
            "" => return Err(ProtocolError::UnknownTopic(s.to_string())),
            "user" => Topic::User,
            "user:notification" => Topic::UserNotification,
            "public" => Topic::Public,
            "public:local" => Topic::PublicLocal,
            "public:remote" => Topic::PublicRemote,
            "direct" => Topic::Direct,
            _ => {
                if let Some(tag) = s.strip_prefix("hashtag:local:") {
                    Topic::HashtagLocal(tag.to_string())
                } else if let Some(tag) = s.strip_prefix("hashtag:") {
                    Topic::Hashtag(tag.to_string())
                } else if let Some(id) = s.strip_prefix("list:") {
                    Topic::List(id.to_string())
                } else if let Some(id) = s.strip_prefix("group:") {
                    Topic::Group(id.to_string())
                } else {
                    Topic::Other(s.to_string())
                }
            }
        };
        Ok(topic)
    }
}

/// Builds `<base>/api/streaming/?stream=<topic>` for `topic`.
///
/// `http` and `https` bases are rewritten to `ws` and `wss`. The access
/// token is never placed in the URL; it travels as the WebSocket
/// sub-protocol.
pub fn streaming_url(base: &str, topic: &Topic) -> ProtocolResult<Url> {
    let invalid = |message: String| ProtocolError::InvalidUrl {
        url: base.to_string(),
        message,
    };

    let mut url = Url::parse(&format!("{}/{}", base.trim_end_matches('/'), STREAMING_PATH))
        .map_err(|e| invalid(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" => Some("ws"),
        "https" => Some("wss"),
        "ws" | "wss" => None,
        other => return Err(invalid(format!("unsupported scheme {other}"))),
    };
    if let Some(scheme) = scheme {
        url.set_scheme(scheme)
            .map_err(|()| invalid("cannot switch scheme".into()))?;
    }

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("stream", topic.stream_name());
        if let Some((key, value)) = topic.param() {
            query.append_pair(key, value);
        }
    }

    Ok(url)
}
