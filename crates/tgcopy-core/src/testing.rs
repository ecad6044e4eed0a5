//! In-memory transport and log capture used by the pipeline tests.

use std::{
    collections::{HashMap, HashSet},
    fs,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    domain::{ChannelHandle, ChannelIdentifier, MediaSource, SourceMessage},
    errors::Error,
    transport::TransportPort,
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ResolveEntity(String),
    ListDialogs,
    GetMessages {
        channel: i64,
        limit: usize,
    },
    Download {
        message: i32,
        source: MediaSource,
        dest: PathBuf,
    },
    SendFile {
        channel: i64,
        path: PathBuf,
        caption: String,
        existed: bool,
    },
    SendMessage {
        channel: i64,
        text: String,
    },
}

#[derive(Default)]
pub struct FakeTransport {
    pub direct: HashMap<String, ChannelHandle>,
    pub dialogs: Vec<ChannelHandle>,
    pub dialogs_fail: bool,
    pub messages: Vec<SourceMessage>,
    /// Downloads for these message ids yield nothing.
    pub empty_downloads: HashSet<i32>,
    /// Fail the next send_file with this error.
    pub send_file_error: Mutex<Option<Error>>,
    /// Fail this many send_message calls with a flood-wait before succeeding.
    pub send_message_floods: Mutex<u32>,
    pub calls: Mutex<Vec<Call>>,
}

pub fn channel(id: i64, title: &str, username: Option<&str>) -> ChannelHandle {
    ChannelHandle {
        id,
        title: title.to_string(),
        username: username.map(str::to_string),
    }
}

impl FakeTransport {
    pub fn with_channels(source: ChannelHandle, target: ChannelHandle) -> Self {
        let mut fake = Self::default();
        fake.direct.insert("@source".to_string(), source);
        fake.direct.insert("@target".to_string(), target);
        fake
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn publishes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::SendFile { .. } | Call::SendMessage { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl TransportPort for FakeTransport {
    async fn resolve_entity(&self, id: &ChannelIdentifier) -> Result<ChannelHandle> {
        self.record(Call::ResolveEntity(id.to_string()));
        self.direct
            .get(&id.to_string())
            .cloned()
            .ok_or_else(|| Error::EntityUnavailable(id.to_string()))
    }

    async fn list_dialogs(&self) -> Result<Vec<ChannelHandle>> {
        self.record(Call::ListDialogs);
        if self.dialogs_fail {
            return Err(Error::Rpc("AUTH_KEY_UNREGISTERED".to_string()));
        }
        Ok(self.dialogs.clone())
    }

    async fn get_messages(
        &self,
        channel: &ChannelHandle,
        limit: usize,
    ) -> Result<Vec<SourceMessage>> {
        self.record(Call::GetMessages {
            channel: channel.id,
            limit,
        });
        Ok(self.messages.iter().take(limit).cloned().collect())
    }

    async fn download_media(
        &self,
        message: &SourceMessage,
        source: MediaSource,
        dest: &Path,
    ) -> Result<Option<PathBuf>> {
        self.record(Call::Download {
            message: message.id.0,
            source,
            dest: dest.to_path_buf(),
        });
        if self.empty_downloads.contains(&message.id.0) {
            return Ok(None);
        }
        fs::write(dest, format!("media of {}", message.id))?;
        Ok(Some(dest.to_path_buf()))
    }

    async fn send_file(&self, channel: &ChannelHandle, path: &Path, caption: &str) -> Result<()> {
        self.record(Call::SendFile {
            channel: channel.id,
            path: path.to_path_buf(),
            caption: caption.to_string(),
            existed: path.exists(),
        });
        match self.send_file_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn send_message(&self, channel: &ChannelHandle, text: &str) -> Result<()> {
        self.record(Call::SendMessage {
            channel: channel.id,
            text: text.to_string(),
        });
        let mut floods = self.send_message_floods.lock().unwrap();
        if *floods > 0 {
            *floods -= 1;
            return Err(Error::FloodWait { seconds: 2 });
        }
        Ok(())
    }
}

/// Collects formatted log lines emitted while its guard is installed.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's tracing output into the capture until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
