use std::sync::Arc;

use tgcopy_core::{
    config::Config,
    preflight::check_channels,
    replicate::{ReplicationSettings, Replicator},
    resolver::EntityResolver,
    staging::StagingArea,
    transport::TransportPort,
};
use tgcopy_telegram::TelegramSession;

#[tokio::main]
async fn main() -> Result<(), tgcopy_core::Error> {
    tgcopy_core::logging::init("tgcopy")?;

    let cfg = Config::load()?;
    tracing::info!("loaded config: {}", cfg.summary());

    let session = TelegramSession::connect(&cfg)
        .await
        .map_err(|e| tgcopy_core::Error::External(format!("telegram login failed: {e:#}")))?;

    let result = run(&cfg, &session).await;
    session.disconnect().await;

    if let Err(e) = &result {
        tracing::error!("copy run failed: {e}");
    }
    result
}

async fn run(cfg: &Config, session: &TelegramSession) -> tgcopy_core::Result<()> {
    let transport: Arc<dyn TransportPort> = Arc::new(session.transport());
    let resolver = Arc::new(EntityResolver::new(transport.clone()));

    if let Err(e) = check_channels(
        &resolver,
        &cfg.source_channel,
        &cfg.target_channel,
        &mut std::io::stdout(),
    )
    .await
    {
        tracing::error!("channel check failed: {e}");
    }

    let staging = StagingArea::open(&cfg.downloads_dir)?;
    let replicator = Replicator::new(transport, resolver, staging, ReplicationSettings::from(cfg));
    replicator
        .replicate(&cfg.source_channel, &cfg.target_channel)
        .await
}
