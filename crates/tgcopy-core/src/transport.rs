use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    domain::{ChannelHandle, ChannelIdentifier, MediaSource, SourceMessage},
    Result,
};

/// Port for the authenticated messaging session.
///
/// Telegram over MTProto is the only implementation; the pipeline only ever talks to this
/// trait so it can be driven by a fake in tests. Every call may fail with
/// `Error::FloodWait`, `Error::EntityUnavailable` or `Error::Rpc`.
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// Direct entity lookup with the raw identifier.
    async fn resolve_entity(&self, id: &ChannelIdentifier) -> Result<ChannelHandle>;

    /// All dialogs of the logged-in account, in platform order.
    async fn list_dialogs(&self) -> Result<Vec<ChannelHandle>>;

    /// Up to `limit` most recent messages of `channel`, in the order the platform returns them.
    async fn get_messages(&self, channel: &ChannelHandle, limit: usize)
        -> Result<Vec<SourceMessage>>;

    /// Download media of `message` to `dest`. `Ok(None)` means nothing was written.
    async fn download_media(
        &self,
        message: &SourceMessage,
        source: MediaSource,
        dest: &Path,
    ) -> Result<Option<PathBuf>>;

    /// Publish a file with a caption.
    async fn send_file(&self, channel: &ChannelHandle, path: &Path, caption: &str) -> Result<()>;

    /// Publish a text-only message.
    async fn send_message(&self, channel: &ChannelHandle, text: &str) -> Result<()>;
}
