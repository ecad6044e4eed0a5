//! Telegram adapter (grammers, MTProto user session).
//!
//! This crate implements the `tgcopy-core` TransportPort. The Bot API cannot read channel
//! history or list an account's dialogs, so the copier logs in as a user.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use grammers_client::{
    session::defs::{PeerAuth, PeerId, PeerRef},
    types::{Media, Peer},
    Client, InputMessage, InvocationError,
};
use tokio::sync::Mutex;

use tgcopy_core::{
    domain::{ChannelHandle, ChannelIdentifier, MediaSource, MessageId, SourceMessage},
    errors::Error,
    transport::TransportPort,
    Result,
};

pub mod media;
pub mod session;

pub use session::TelegramSession;

/// RPC error names meaning "this entity does not exist or is not visible to us".
const ENTITY_ERRORS: [&str; 6] = [
    "CHANNEL_INVALID",
    "CHANNEL_PRIVATE",
    "CHAT_ID_INVALID",
    "PEER_ID_INVALID",
    "USERNAME_INVALID",
    "USERNAME_NOT_OCCUPIED",
];

pub struct GrammersTransport {
    client: Client,
    /// Peers seen through lookups and dialog listing, keyed by marked dialog id.
    peers: Mutex<HashMap<i64, Peer>>,
    /// Media of the last fetched message window, keyed by message id.
    media: Mutex<HashMap<i32, Media>>,
}

impl GrammersTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            peers: Mutex::new(HashMap::new()),
            media: Mutex::new(HashMap::new()),
        }
    }

    async fn remember(&self, peer: Peer) -> ChannelHandle {
        let handle = ChannelHandle {
            id: peer.id().bot_api_dialog_id(),
            title: peer.name().unwrap_or("<unknown>").to_string(),
            username: peer.username().map(|s| s.to_string()),
        };
        self.peers.lock().await.insert(handle.id, peer);
        handle
    }

    async fn peer_for(&self, channel: &ChannelHandle) -> Result<Peer> {
        if let Some(peer) = self.peers.lock().await.get(&channel.id) {
            return Ok(peer.clone());
        }
        self.client
            .resolve_peer(peer_ref_for(channel.id))
            .await
            .map_err(map_invocation)
    }
}

/// Bare peer id decoded from a Bot API style marked dialog id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MarkedId {
    User(i64),
    Chat(i64),
    Channel(i64),
}

fn unmark(dialog_id: i64) -> MarkedId {
    if dialog_id > 0 {
        MarkedId::User(dialog_id)
    } else if dialog_id <= -1_000_000_000_001 {
        MarkedId::Channel(-dialog_id - 1_000_000_000_000)
    } else {
        MarkedId::Chat(-dialog_id)
    }
}

/// Convert a marked dialog id to a PeerRef using ambient authority (access_hash=0).
fn peer_ref_for(dialog_id: i64) -> PeerRef {
    let id = match unmark(dialog_id) {
        MarkedId::User(id) => PeerId::user(id),
        MarkedId::Chat(id) => PeerId::chat(id),
        MarkedId::Channel(id) => PeerId::channel(id),
    };
    PeerRef {
        id,
        auth: PeerAuth::default(),
    }
}

pub(crate) fn map_invocation(e: InvocationError) -> Error {
    match &e {
        InvocationError::Rpc(rpc) if rpc.name.starts_with("FLOOD") && rpc.name.ends_with("WAIT") => {
            Error::FloodWait {
                seconds: rpc.value.unwrap_or(0) as u64,
            }
        }
        InvocationError::Rpc(rpc) if ENTITY_ERRORS.contains(&rpc.name.as_str()) => {
            Error::EntityUnavailable(rpc.name.clone())
        }
        _ => Error::Rpc(e.to_string()),
    }
}

fn is_photo_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg" | "png")
    )
}

#[async_trait]
impl TransportPort for GrammersTransport {
    async fn resolve_entity(&self, id: &ChannelIdentifier) -> Result<ChannelHandle> {
        let peer = match id.numeric_id() {
            Some(dialog_id) => self
                .client
                .resolve_peer(peer_ref_for(dialog_id))
                .await
                .map_err(map_invocation)?,
            None => {
                let username = id.bare_handle().unwrap_or_default();
                self.client
                    .resolve_username(username)
                    .await
                    .map_err(map_invocation)?
                    .ok_or_else(|| Error::EntityUnavailable(format!("@{username}")))?
            }
        };
        Ok(self.remember(peer).await)
    }

    async fn list_dialogs(&self) -> Result<Vec<ChannelHandle>> {
        let mut out = Vec::new();
        let mut dialogs = self.client.iter_dialogs();
        while let Some(dialog) = dialogs.next().await.map_err(map_invocation)? {
            out.push(self.remember(dialog.peer().clone()).await);
        }
        tracing::debug!("listed {} dialogs", out.len());
        Ok(out)
    }

    async fn get_messages(
        &self,
        channel: &ChannelHandle,
        limit: usize,
    ) -> Result<Vec<SourceMessage>> {
        let peer = self.peer_for(channel).await?;
        let mut cache = HashMap::new();
        let mut out = Vec::new();

        let mut messages = self.client.iter_messages(PeerRef::from(&peer));
        while out.len() < limit {
            let Some(msg) = messages.next().await.map_err(map_invocation)? else {
                break;
            };
            let media = msg.media();
            out.push(SourceMessage {
                id: MessageId(msg.id()),
                text: msg.text().to_string(),
                media: media.as_ref().map(media::media_kind),
            });
            if let Some(media) = media {
                cache.insert(msg.id(), media);
            }
        }

        *self.media.lock().await = cache;
        Ok(out)
    }

    async fn download_media(
        &self,
        message: &SourceMessage,
        source: MediaSource,
        dest: &Path,
    ) -> Result<Option<PathBuf>> {
        let Some(media) = self.media.lock().await.get(&message.id.0).cloned() else {
            tracing::warn!("no media cached for message {}", message.id);
            return Ok(None);
        };

        match source {
            MediaSource::Attached => {
                if !media::download_attached(&self.client, &media, dest).await? {
                    return Ok(None);
                }
            }
            MediaSource::WebPagePhoto => {
                let Some(photo) = media::webpage_photo(&media) else {
                    return Ok(None);
                };
                if !media::download_photo(&self.client, &photo, dest).await? {
                    return Ok(None);
                }
            }
        }

        match tokio::fs::metadata(dest).await {
            Ok(meta) if meta.len() > 0 => Ok(Some(dest.to_path_buf())),
            _ => Ok(None),
        }
    }

    async fn send_file(&self, channel: &ChannelHandle, path: &Path, caption: &str) -> Result<()> {
        let peer = self.peer_for(channel).await?;
        let uploaded = self
            .client
            .upload_file(path)
            .await
            .map_err(|e| Error::External(format!("upload of {} failed: {e}", path.display())))?;

        let message = InputMessage::new().text(caption);
        let message = if is_photo_file(path) {
            message.photo(uploaded)
        } else {
            message.file(uploaded)
        };

        self.client
            .send_message(&peer, message)
            .await
            .map_err(map_invocation)?;
        Ok(())
    }

    async fn send_message(&self, channel: &ChannelHandle, text: &str) -> Result<()> {
        let peer = self.peer_for(channel).await?;
        self.client
            .send_message(&peer, InputMessage::new().text(text))
            .await
            .map_err(map_invocation)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use grammers_mtsender::RpcError;

    fn rpc(name: &str, value: Option<u32>) -> InvocationError {
        InvocationError::Rpc(RpcError {
            code: 420,
            name: name.to_string(),
            value,
            caused_by: None,
        })
    }

    #[test]
    fn flood_waits_become_retryable() {
        assert!(matches!(
            map_invocation(rpc("FLOOD_WAIT", Some(17))),
            Error::FloodWait { seconds: 17 }
        ));
        assert!(matches!(
            map_invocation(rpc("FLOOD_PREMIUM_WAIT", Some(5))),
            Error::FloodWait { seconds: 5 }
        ));
        assert!(map_invocation(rpc("FLOOD_WAIT", Some(3))).retry_after().is_some());
    }

    #[test]
    fn entity_errors_are_unavailable() {
        assert!(matches!(
            map_invocation(rpc("CHANNEL_PRIVATE", None)),
            Error::EntityUnavailable(name) if name == "CHANNEL_PRIVATE"
        ));
        assert!(matches!(
            map_invocation(rpc("USERNAME_NOT_OCCUPIED", None)),
            Error::EntityUnavailable(_)
        ));
    }

    #[test]
    fn other_rpc_errors_are_not_retried() {
        let err = map_invocation(rpc("CHAT_WRITE_FORBIDDEN", None));
        assert!(matches!(err, Error::Rpc(_)));
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn marked_ids_decode_to_peer_kinds() {
        assert_eq!(unmark(-1001234567890), MarkedId::Channel(1234567890));
        assert_eq!(unmark(-1000000000001), MarkedId::Channel(1));
        assert_eq!(unmark(-42), MarkedId::Chat(42));
        assert_eq!(unmark(42), MarkedId::User(42));
    }

    #[test]
    fn photo_files_are_detected_by_extension() {
        assert!(is_photo_file(Path::new("downloads/1.jpg")));
        assert!(is_photo_file(Path::new("downloads/1.PNG")));
        assert!(!is_photo_file(Path::new("downloads/1.pdf")));
        assert!(!is_photo_file(Path::new("downloads/1")));
    }
}
