use anyhow::Context;
use tracing::{error, info};

use warden_engine::{CredentialEngine, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_observability::init();

    let config = EngineConfig::from_env().context("reading configuration")?;
    let engine = CredentialEngine::bootstrap(config)
        .await
        .context("refusing to start without key material")?;

    let status = engine.status();
    info!(
        active_kid = ?status.active_kid,
        verification_kids = ?status.verification_kids,
        "warden started"
    );

    wait_for_shutdown(&engine).await
}

/// SIGHUP reloads key material; Ctrl-C exits.
#[cfg(unix)]
async fn wait_for_shutdown(engine: &CredentialEngine) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).context("installing SIGHUP handler")?;
    loop {
        tokio::select! {
            _ = hangup.recv() => {
                if let Err(err) = engine.reload().await {
                    error!(error = %err, "reload failed; keeping current keys");
                }
            }
            res = tokio::signal::ctrl_c() => {
                res.context("waiting for Ctrl-C")?;
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_engine: &CredentialEngine) -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("shutting down");
    Ok(())
}
