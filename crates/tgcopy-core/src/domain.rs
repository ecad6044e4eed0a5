use std::fmt;

use serde::Deserialize;

/// Channel identifier as written in the config file: a numeric id or a handle.
///
/// Opaque until resolved; `@name`, `name` and `-100123` are all accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum ChannelIdentifier {
    Id(i64),
    Handle(String),
}

impl ChannelIdentifier {
    /// Handle with any leading `@` markers removed.
    pub fn bare_handle(&self) -> Option<&str> {
        match self {
            ChannelIdentifier::Id(_) => None,
            ChannelIdentifier::Handle(h) => Some(h.trim().trim_start_matches('@')),
        }
    }

    /// Numeric id, also when the config spelled it as a string.
    pub fn numeric_id(&self) -> Option<i64> {
        match self {
            ChannelIdentifier::Id(id) => Some(*id),
            ChannelIdentifier::Handle(h) => h.trim().parse::<i64>().ok(),
        }
    }
}

impl fmt::Display for ChannelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelIdentifier::Id(id) => write!(f, "{id}"),
            ChannelIdentifier::Handle(h) => f.write_str(h),
        }
    }
}

impl From<i64> for ChannelIdentifier {
    fn from(id: i64) -> Self {
        ChannelIdentifier::Id(id)
    }
}

impl From<&str> for ChannelIdentifier {
    fn from(h: &str) -> Self {
        ChannelIdentifier::Handle(h.to_string())
    }
}

/// A resolved channel (or group/user dialog). `id` is the marked dialog id (`-100…` for
/// channels).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
}

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the transport saw attached to a message, before classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Document { mime_type: Option<String> },
    /// Link preview; `page_type` is the embedded type reported by the platform ("photo",
    /// "article", "video", ...).
    WebPage { page_type: Option<String> },
    Poll,
    Dice,
    Unsupported,
    Other(String),
}

/// A message fetched from the source channel. Immutable once fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMessage {
    pub id: MessageId,
    pub text: String,
    pub media: Option<MediaKind>,
}

impl SourceMessage {
    pub fn text(id: i32, text: &str) -> Self {
        Self {
            id: MessageId(id),
            text: text.to_string(),
            media: None,
        }
    }

    pub fn with_media(id: i32, text: &str, media: MediaKind) -> Self {
        Self {
            id: MessageId(id),
            text: text.to_string(),
            media: Some(media),
        }
    }
}

/// Which object of a message the download step fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaSource {
    /// The media attached to the message itself.
    Attached,
    /// The photo embedded in a web-page preview.
    WebPagePhoto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_deserializes_from_number_or_string() {
        let id: ChannelIdentifier = serde_json::from_str("-1001234").unwrap();
        assert_eq!(id, ChannelIdentifier::Id(-1001234));

        let h: ChannelIdentifier = serde_json::from_str("\"@news\"").unwrap();
        assert_eq!(h, ChannelIdentifier::Handle("@news".to_string()));
        assert_eq!(h.bare_handle(), Some("news"));
        assert_eq!(h.numeric_id(), None);
    }

    #[test]
    fn numeric_string_is_treated_as_id() {
        let h = ChannelIdentifier::from("-100555");
        assert_eq!(h.numeric_id(), Some(-100555));
        assert_eq!(h.to_string(), "-100555");
    }
}
