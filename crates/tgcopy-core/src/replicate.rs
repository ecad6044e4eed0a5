//! Replication driver: resolve both channels, fetch the recent window, copy message by message.

use std::sync::Arc;

use crate::{
    config::Config,
    domain::{ChannelHandle, ChannelIdentifier, SourceMessage},
    errors::Error,
    media::{classify, ReplicationPlan},
    pacing::{FloodRetryPolicy, Pacer, PacingPolicy},
    resolver::EntityResolver,
    staging::StagingArea,
    transport::TransportPort,
    Result,
};

pub const DEFAULT_WINDOW: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplicationSettings {
    /// How many of the most recent messages to copy.
    pub window: usize,
    pub pacing: PacingPolicy,
    pub flood_retry: FloodRetryPolicy,
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            pacing: PacingPolicy::default(),
            flood_retry: FloodRetryPolicy::default(),
        }
    }
}

impl From<&Config> for ReplicationSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            window: cfg.message_limit,
            pacing: cfg.pacing,
            flood_retry: cfg.flood_retry,
        }
    }
}

/// Result of replicating a single message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageOutcome {
    CopiedWithMedia,
    CopiedAsText,
    /// Media could not be carried over; the text was copied instead.
    Degraded { kind: String },
    /// The media download produced nothing; the message was skipped.
    DownloadFailed,
}

pub struct Replicator {
    transport: Arc<dyn TransportPort>,
    resolver: Arc<EntityResolver>,
    staging: StagingArea,
    settings: ReplicationSettings,
}

impl Replicator {
    pub fn new(
        transport: Arc<dyn TransportPort>,
        resolver: Arc<EntityResolver>,
        staging: StagingArea,
        settings: ReplicationSettings,
    ) -> Self {
        Self {
            transport,
            resolver,
            staging,
            settings,
        }
    }

    /// Copy the most recent `window` messages from `source` to `target`, in fetch order.
    ///
    /// Fails without touching any message when either channel cannot be resolved. Transport
    /// errors that survive the flood-retry policy end the run.
    pub async fn replicate(
        &self,
        source: &ChannelIdentifier,
        target: &ChannelIdentifier,
    ) -> Result<()> {
        let source_handle = self.resolver.resolve(source).await;
        let target_handle = self.resolver.resolve(target).await;

        let source_handle = source_handle.ok_or_else(|| not_found("source", source))?;
        let target_handle = target_handle.ok_or_else(|| not_found("target", target))?;

        let transport = &self.transport;
        let from = &source_handle;
        let window = self.settings.window;
        let messages = self
            .settings
            .flood_retry
            .run("fetch messages", move || transport.get_messages(from, window))
            .await?;

        tracing::info!(
            "copying {} messages from {} ({}) to {} ({}), staging media in {}",
            messages.len(),
            source_handle.title,
            source_handle.id,
            target_handle.title,
            target_handle.id,
            self.staging.dir().display()
        );

        let mut pacer = Pacer::new(self.settings.pacing);
        for message in &messages {
            pacer.pace().await;
            self.replicate_message(message, &target_handle).await?;
        }

        Ok(())
    }

    /// Replicate one message. Recoverable problems are reported in the outcome, transport
    /// failures as errors. Any staged file is gone when this returns.
    pub async fn replicate_message(
        &self,
        message: &SourceMessage,
        target: &ChannelHandle,
    ) -> Result<MessageOutcome> {
        let id = message.id;
        let transport = &self.transport;
        let retry = self.settings.flood_retry;

        match classify(message).plan() {
            ReplicationPlan::SendText { degraded_from } => {
                if let Some(kind) = &degraded_from {
                    tracing::warn!("unsupported media type '{kind}' in message {id}; copying text only");
                }

                let text = message.text.as_str();
                retry
                    .run("send message", move || transport.send_message(target, text))
                    .await?;
                tracing::info!("text message {id} copied");

                Ok(match degraded_from {
                    Some(kind) => MessageOutcome::Degraded { kind },
                    None => MessageOutcome::CopiedAsText,
                })
            }
            ReplicationPlan::DownloadAndSend { file_name, source } => {
                let mut staged = self.staging.stage(id, &file_name);

                let dest = staged.path().to_path_buf();
                let dest = dest.as_path();
                let downloaded = retry
                    .run("download media", move || {
                        transport.download_media(message, source, dest)
                    })
                    .await?;

                let Some(written) = downloaded else {
                    tracing::warn!(
                        "failed to download media for message {}",
                        staged.message_id()
                    );
                    return Ok(MessageOutcome::DownloadFailed);
                };
                staged.adopt(written);

                let path = staged.path().to_path_buf();
                let path = path.as_path();
                let caption = message.text.as_str();
                let sent = retry
                    .run("send file", move || transport.send_file(target, path, caption))
                    .await;
                staged.release();
                sent?;

                tracing::info!("message {id} copied");
                Ok(MessageOutcome::CopiedWithMedia)
            }
        }
    }
}

fn not_found(role: &str, identifier: &ChannelIdentifier) -> Error {
    tracing::error!("could not resolve the {role} channel ({identifier}); nothing copied");
    Error::ChannelNotFound {
        role: role.to_string(),
        identifier: identifier.to_string(),
    }
}
