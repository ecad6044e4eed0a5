use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    domain::ChannelIdentifier,
    errors::Error,
    pacing::{FloodRetryPolicy, PacingPolicy},
    Result,
};

pub const DEFAULT_CONFIG_FILE: &str = "cfg.json";

/// Keys that must be present in the config file.
pub const REQUIRED_KEYS: [&str; 5] = [
    "api_id",
    "api_hash",
    "phone_number",
    "source_channel",
    "target_channel",
];

/// Typed configuration for one copy run.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram account (https://my.telegram.org)
    pub api_id: i32,
    pub api_hash: String,
    pub phone_number: String,

    // What to copy
    pub source_channel: ChannelIdentifier,
    pub target_channel: ChannelIdentifier,
    pub message_limit: usize,

    // Local state
    pub session_file: PathBuf,
    pub downloads_dir: PathBuf,

    // Rate limiting
    pub pacing: PacingPolicy,
    pub flood_retry: FloodRetryPolicy,
}

#[derive(Deserialize)]
struct FileConfig {
    api_id: i32,
    api_hash: String,
    phone_number: String,
    source_channel: ChannelIdentifier,
    target_channel: ChannelIdentifier,

    #[serde(default)]
    session_file: Option<PathBuf>,
    #[serde(default)]
    downloads_dir: Option<PathBuf>,
    #[serde(default)]
    message_limit: Option<usize>,
    #[serde(default)]
    pace_interval_ms: Option<u64>,
    #[serde(default)]
    flood_max_retries: Option<u32>,
    #[serde(default)]
    flood_max_wait_secs: Option<u64>,
}

impl Config {
    /// Load from the path given as first CLI argument, `TGCOPY_CONFIG`, or `cfg.json`,
    /// then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = env::args_os()
            .nth(1)
            .map(PathBuf::from)
            .or_else(|| env_path("TGCOPY_CONFIG"))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut cfg = Self::from_file(&path)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "config file '{}' not found",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)?;
        tracing::debug!("read config file {} ({} bytes)", path.display(), contents.len());
        Self::from_json_str(&contents)
    }

    /// Parse and validate config file contents. Every missing required key is reported at once.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(contents)
            .map_err(|e| Error::Config(format!("failed to parse config file: {e}")))?;

        let Some(obj) = value.as_object() else {
            return Err(Error::Config(
                "config file must contain a JSON object".to_string(),
            ));
        };

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|k| !obj.contains_key(**k))
            .map(|k| k.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingKeys(missing));
        }

        let raw: FileConfig = serde_json::from_value(value)?;

        if raw.api_hash.trim().is_empty() {
            return Err(Error::Config("api_hash must not be empty".to_string()));
        }
        if raw.phone_number.trim().is_empty() {
            return Err(Error::Config("phone_number must not be empty".to_string()));
        }

        let defaults = FloodRetryPolicy::default();
        let flood_retry = FloodRetryPolicy {
            max_retries: raw.flood_max_retries.unwrap_or(defaults.max_retries),
            max_wait: raw
                .flood_max_wait_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_wait),
            backoff_floor: defaults.backoff_floor,
        };

        let pacing = raw
            .pace_interval_ms
            .map(|ms| PacingPolicy {
                min_interval: Duration::from_millis(ms),
            })
            .unwrap_or_default();

        Ok(Self {
            api_id: raw.api_id,
            api_hash: raw.api_hash,
            phone_number: raw.phone_number,
            source_channel: raw.source_channel,
            target_channel: raw.target_channel,
            message_limit: raw.message_limit.unwrap_or(1000),
            session_file: raw
                .session_file
                .unwrap_or_else(|| PathBuf::from("tgcopy.session")),
            downloads_dir: raw
                .downloads_dir
                .unwrap_or_else(|| PathBuf::from("downloads")),
            pacing,
            flood_retry,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Some(dir) = env_path("TGCOPY_DOWNLOADS_DIR") {
            self.downloads_dir = dir;
        }
        if let Some(limit) = env_usize("TGCOPY_MESSAGE_LIMIT") {
            self.message_limit = limit;
        }
        if let Some(ms) = env_u64("TGCOPY_PACE_MS") {
            self.pacing.min_interval = Duration::from_millis(ms);
        }
        if let Some(n) = env_u32("TGCOPY_FLOOD_RETRIES") {
            self.flood_retry.max_retries = n;
        }
    }

    /// One-line description safe for logs (no API hash, masked phone number).
    pub fn summary(&self) -> String {
        format!(
            "api_id={} phone={} source={} target={} limit={} pace={}ms flood_retries={} downloads={}",
            self.api_id,
            mask_phone(&self.phone_number),
            self.source_channel,
            self.target_channel,
            self.message_limit,
            self.pacing.min_interval.as_millis(),
            self.flood_retry.max_retries,
            self.downloads_dir.display()
        )
    }
}

fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().collect();
    if digits.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("***{tail}")
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}
