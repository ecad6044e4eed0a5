//! Connecting and logging in as a user account.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use grammers_client::{session::storages::SqliteSession, Client, SignInError};
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    task::JoinHandle,
};

use tgcopy_core::config::Config;

use crate::GrammersTransport;

/// An authorized MTProto session.
///
/// Created by [`TelegramSession::connect`]; call [`TelegramSession::disconnect`] when done. If
/// the value is dropped instead, the sender pool is still told to quit.
pub struct TelegramSession {
    client: Client,
    handle: SenderPoolHandle,
    runner: Option<JoinHandle<()>>,
}

impl TelegramSession {
    /// Open the session file, start the sender pool and log in if the session is not
    /// authorized yet.
    pub async fn connect(cfg: &Config) -> anyhow::Result<Self> {
        let session = SqliteSession::open(&cfg.session_file).with_context(|| {
            format!(
                "failed to open/create telegram session {}",
                cfg.session_file.display()
            )
        })?;
        let pool = SenderPool::new(Arc::new(session), cfg.api_id);
        let client = Client::new(&pool);
        let SenderPool { runner, handle, .. } = pool;
        let runner = tokio::spawn(async move {
            runner.run().await;
        });

        let session = Self {
            client,
            handle,
            runner: Some(runner),
        };

        let authorized = session
            .client
            .is_authorized()
            .await
            .context("failed to check authorization")?;
        if !authorized {
            login(&session.client, cfg).await?;
        }

        let me = session.client.get_me().await.context("failed to fetch own account")?;
        tracing::info!(
            "logged in as {} (id {})",
            me.username().unwrap_or("<no username>"),
            me.bare_id()
        );

        Ok(session)
    }

    pub fn transport(&self) -> GrammersTransport {
        GrammersTransport::new(self.client.clone())
    }

    /// Stop the sender pool and wait for it to wind down.
    pub async fn disconnect(mut self) {
        self.handle.quit();
        if let Some(runner) = self.runner.take() {
            if let Err(e) = runner.await {
                tracing::warn!("telegram sender pool join failed: {e}");
            }
        }
        tracing::info!("disconnected from telegram");
    }
}

impl Drop for TelegramSession {
    fn drop(&mut self) {
        if self.runner.is_some() {
            self.handle.quit();
        }
    }
}

async fn login(client: &Client, cfg: &Config) -> anyhow::Result<()> {
    tracing::info!("session is not authorized; requesting a login code");

    let token = client
        .request_login_code(&cfg.phone_number, &cfg.api_hash)
        .await
        .context("failed to request login code")?;
    let code = prompt("TGCOPY_LOGIN_CODE", "Enter the login code you received: ").await?;

    match client.sign_in(&token, &code).await {
        Ok(_) => {}
        Err(SignInError::PasswordRequired(password_token)) => {
            let password = prompt("TGCOPY_2FA_PASSWORD", "Enter your two-step verification password: ")
                .await?;
            client
                .check_password(password_token, password.as_bytes())
                .await
                .map_err(|e| anyhow!("two-step verification failed: {e}"))?;
        }
        Err(e) => return Err(anyhow!("sign in failed: {e}")),
    }

    tracing::info!("signed in; session saved to {}", cfg.session_file.display());
    Ok(())
}

/// Read a value from `env_key`, or ask for it on stdin.
async fn prompt(env_key: &str, question: &str) -> anyhow::Result<String> {
    if let Ok(v) = std::env::var(env_key) {
        if !v.trim().is_empty() {
            return Ok(v.trim().to_string());
        }
    }

    let mut stdout = tokio::io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read from stdin")?;

    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("no value given (set {env_key} to run non-interactively)");
    }
    Ok(value)
}
