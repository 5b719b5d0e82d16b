//! DDL Watcher (spec.md §4.G): installs a notify function plus event
//! triggers in a dedicated `pghatch_watch` schema, and runs a long-lived
//! `LISTEN` connection that forwards debounced rebuild signals to whoever
//! holds the receiving half of the channel.

use pgcat_core::{Error, IntrospectionErrorKind, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_postgres::{AsyncMessage, Client, Config, NoTls};

const WATCH_SCHEMA: &str = "pghatch_watch";
const CHANNEL: &str = "pghatch_watch_ddl";

const INSTALL_SQL: &str = r#"
CREATE SCHEMA IF NOT EXISTS pghatch_watch;

CREATE OR REPLACE FUNCTION pghatch_watch.notify_ddl() RETURNS event_trigger AS $$
BEGIN
    PERFORM pg_notify('pghatch_watch_ddl', tg_tag);
END;
$$ LANGUAGE plpgsql;

DROP EVENT TRIGGER IF EXISTS pghatch_watch_ddl_end;
CREATE EVENT TRIGGER pghatch_watch_ddl_end
    ON ddl_command_end
    EXECUTE FUNCTION pghatch_watch.notify_ddl();

DROP EVENT TRIGGER IF EXISTS pghatch_watch_sql_drop;
CREATE EVENT TRIGGER pghatch_watch_sql_drop
    ON sql_drop
    EXECUTE FUNCTION pghatch_watch.notify_ddl();
"#;

const UNINSTALL_SQL: &str = r#"
DROP EVENT TRIGGER IF EXISTS pghatch_watch_ddl_end;
DROP EVENT TRIGGER IF EXISTS pghatch_watch_sql_drop;
DROP SCHEMA IF EXISTS pghatch_watch CASCADE;
"#;

/// Idempotent: re-running `install` after a prior install just replaces the
/// function and event triggers in place.
pub async fn install(client: &Client) -> Result<()> {
    client
        .batch_execute(INSTALL_SQL)
        .await
        .map_err(|e| Error::Internal(format!("failed to install DDL watch schema: {e}")))
}

pub async fn uninstall(client: &Client) -> Result<()> {
    client
        .batch_execute(UNINSTALL_SQL)
        .await
        .map_err(|e| Error::Internal(format!("failed to uninstall DDL watch schema: {e}")))
}

#[derive(Debug, Clone, Copy)]
pub struct WatcherSettings {
    pub debounce: Duration,
    pub heartbeat: Duration,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            heartbeat: Duration::from_secs(30),
        }
    }
}

/// Signal sent to the Schema Router to trigger a rebuild. Coalesces bursts
/// of DDL notifications within the debounce window into one signal.
pub struct RebuildSignal;

/// Runs forever (until the process shuts down), reconnecting with
/// exponential backoff (base 250ms, cap 30s per spec.md §7) whenever the
/// listener connection drops, and forcing a rebuild on every reconnect.
pub async fn run_watch_loop(dsn: String, settings: WatcherSettings, tx: mpsc::Sender<RebuildSignal>) {
    let mut backoff = Duration::from_millis(250);
    loop {
        match run_single_connection(&dsn, settings, &tx).await {
            Ok(()) => {
                // Graceful shutdown: channel receiver was dropped.
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, backoff_ms = backoff.as_millis(), "ddl watch connection lost, retrying");
                let _ = tx.send(RebuildSignal).await;
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(Duration::from_secs(30));
            }
        }
    }
}

async fn run_single_connection(
    dsn: &str,
    settings: WatcherSettings,
    tx: &mpsc::Sender<RebuildSignal>,
) -> Result<()> {
    let config: Config = dsn
        .parse()
        .map_err(|e| Error::Internal(format!("invalid DSN: {e}")))?;
    let (client, mut connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| Error::Introspection {
            kind: IntrospectionErrorKind::ConnectionLost,
            context: e.to_string(),
        })?;

    install(&client).await?;
    client
        .batch_execute(&format!("LISTEN {CHANNEL}"))
        .await
        .map_err(|e| Error::Internal(format!("failed to LISTEN on {CHANNEL}: {e}")))?;

    // Force an initial rebuild so a fresh connection always syncs state.
    let _ = tx.send(RebuildSignal).await;

    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<()>();
    let poll_messages = async move {
        loop {
            match futures::future::poll_fn(|cx| connection.poll_message(cx)).await {
                Some(Ok(AsyncMessage::Notification(_))) => {
                    if notify_tx.send(()).is_err() {
                        return;
                    }
                }
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return,
            }
        }
    };
    tokio::spawn(poll_messages);

    loop {
        tokio::select! {
            received = notify_rx.recv() => {
                if received.is_none() {
                    return Err(Error::Introspection {
                        kind: IntrospectionErrorKind::ConnectionLost,
                        context: "listener connection closed".to_string(),
                    });
                }
                drain_and_debounce(&mut notify_rx, settings.debounce).await;
                if tx.send(RebuildSignal).await.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::time::sleep(settings.heartbeat) => {
                if client.simple_query("SELECT 1").await.is_err() {
                    return Err(Error::Introspection {
                        kind: IntrospectionErrorKind::ConnectionLost,
                        context: "heartbeat query failed".to_string(),
                    });
                }
            }
        }
    }
}

async fn drain_and_debounce(rx: &mut mpsc::UnboundedReceiver<()>, debounce: Duration) {
    loop {
        tokio::select! {
            more = rx.recv() => {
                if more.is_none() {
                    return;
                }
            }
            _ = tokio::time::sleep(debounce) => return,
        }
    }
}
