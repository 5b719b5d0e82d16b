use clap::Parser;
use pgcat_postgres::{build_pool, run_watch_loop, PoolSettings, WatcherSettings};
use pgcat_server::config::{find_config_file, Config};
use pgcat_server::{app, logging, AppState, SchemaRouter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "pgcatd", version, about = "PostgreSQL catalog REST gateway")]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err:#}");
            std::process::exit(2);
        }
    };

    logging::init(&config.log.level, config.log.format);
    info!("starting pgcatd");

    if let Err(err) = run(config, &cli.listen).await {
        error!(error = %err, "unrecoverable startup failure");
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path.or_else(find_config_file) {
        Some(path) => Config::from_path(&path),
        None => Err(anyhow::anyhow!(
            "no pgcat.toml found and PGCAT_DATABASE_URL is not set"
        )),
    }
}

async fn run(config: Config, listen: &str) -> anyhow::Result<()> {
    let excluded_objects = config.compiled_excluded_objects()?;

    let pool = build_pool(&PoolSettings {
        dsn: config.database_url.clone(),
        min: config.pool.min,
        max: config.pool.max,
        max_lifetime: Duration::from_secs(config.pool.max_lifetime_s),
    })?;

    let acquire_timeout = Duration::from_secs(config.request.timeout_s);
    let router = SchemaRouter::new(
        pool,
        config.namespaces.clone(),
        excluded_objects,
        acquire_timeout,
    )
    .await?;
    router.spawn_reconciliation_timer(Duration::from_secs(60));

    let (tx, rx) = tokio::sync::mpsc::channel(16);
    router.spawn_watch_consumer(rx);
    tokio::spawn(run_watch_loop(
        config.database_url.clone(),
        WatcherSettings {
            debounce: Duration::from_millis(config.watcher.debounce_ms),
            heartbeat: Duration::from_secs(config.watcher.heartbeat_s),
        },
        tx,
    ));

    let state = AppState {
        router,
        config: Arc::new(config),
    };
    let app = app::build_router(state);

    info!(%listen, "listening");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
