//! Media classification: which replication path a message takes.

use crate::domain::{MediaKind, MediaSource, MessageId, SourceMessage};

/// Embedded content of a link preview.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebPagePreview {
    Photo { file_name: String },
    Other,
}

/// Classified media of a message. Every variant maps to exactly one replication path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaDescriptor {
    None,
    Photo { file_name: String },
    Document { mime_type: Option<String>, file_name: String },
    WebPage(WebPagePreview),
    Poll,
    Dice,
    Unsupported { kind: String },
}

/// How to replicate a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplicationPlan {
    /// Download `source` to a staged file named `file_name`, then publish it with the text as
    /// caption.
    DownloadAndSend {
        file_name: String,
        source: MediaSource,
    },
    /// Publish the text only. `degraded_from` names media that could not be carried over.
    SendText { degraded_from: Option<String> },
}

pub fn classify(message: &SourceMessage) -> MediaDescriptor {
    let Some(media) = &message.media else {
        return MediaDescriptor::None;
    };

    match media {
        MediaKind::Photo => MediaDescriptor::Photo {
            file_name: jpg_name(message.id),
        },
        MediaKind::Document { mime_type } => MediaDescriptor::Document {
            file_name: format!("{}.{}", message.id, extension_for_mime(mime_type.as_deref())),
            mime_type: mime_type.clone(),
        },
        MediaKind::WebPage { page_type } if page_type.as_deref() == Some("photo") => {
            MediaDescriptor::WebPage(WebPagePreview::Photo {
                file_name: jpg_name(message.id),
            })
        }
        MediaKind::WebPage { .. } => MediaDescriptor::WebPage(WebPagePreview::Other),
        MediaKind::Poll => MediaDescriptor::Poll,
        MediaKind::Dice => MediaDescriptor::Dice,
        MediaKind::Unsupported => MediaDescriptor::Unsupported {
            kind: "unsupported".to_string(),
        },
        MediaKind::Other(kind) => MediaDescriptor::Unsupported { kind: kind.clone() },
    }
}

/// File extension for a document: the MIME subtype, or `unknown` without a MIME type.
pub fn extension_for_mime(mime_type: Option<&str>) -> &str {
    match mime_type {
        Some(mime) if !mime.is_empty() => mime.rsplit('/').next().unwrap_or(mime),
        _ => "unknown",
    }
}

fn jpg_name(id: MessageId) -> String {
    format!("{id}.jpg")
}

impl MediaDescriptor {
    pub fn plan(&self) -> ReplicationPlan {
        match self {
            MediaDescriptor::None | MediaDescriptor::WebPage(WebPagePreview::Other) => {
                ReplicationPlan::SendText {
                    degraded_from: None,
                }
            }
            MediaDescriptor::Photo { file_name } | MediaDescriptor::Document { file_name, .. } => {
                ReplicationPlan::DownloadAndSend {
                    file_name: file_name.clone(),
                    source: MediaSource::Attached,
                }
            }
            MediaDescriptor::WebPage(WebPagePreview::Photo { file_name }) => {
                ReplicationPlan::DownloadAndSend {
                    file_name: file_name.clone(),
                    source: MediaSource::WebPagePhoto,
                }
            }
            MediaDescriptor::Poll => ReplicationPlan::SendText {
                degraded_from: Some("poll".to_string()),
            },
            MediaDescriptor::Dice => ReplicationPlan::SendText {
                degraded_from: Some("dice".to_string()),
            },
            MediaDescriptor::Unsupported { kind } => ReplicationPlan::SendText {
                degraded_from: Some(kind.clone()),
            },
        }
    }
}
