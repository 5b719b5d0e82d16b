//! Schema Router (spec.md §4.F): owns the connection pool and the
//! currently-published `ResolverSet`, and runs the hot-swap protocol that
//! rebuilds both after a DDL notification or the periodic reconciliation
//! timer.

use arc_swap::ArcSwap;
use deadpool_postgres::Pool;
use pgcat_core::types::TypeRegistry;
use pgcat_core::{Error, SchemaModel};
use pgcat_postgres::{introspect_schema, IntrospectionFilter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Everything a request needs to resolve one namespace/object pair,
/// published as a single unit so in-flight requests never observe half of
/// an old snapshot and half of a new one.
pub struct RouterState {
    pub schema: Arc<SchemaModel>,
    pub registry: Arc<TypeRegistry>,
}

pub struct SchemaRouter {
    pool: Pool,
    namespaces: Vec<String>,
    excluded_objects: Vec<regex::Regex>,
    acquire_timeout: Duration,
    state: ArcSwap<RouterState>,
    rebuild_lock: Mutex<()>,
}

impl SchemaRouter {
    pub async fn new(
        pool: Pool,
        namespaces: Vec<String>,
        excluded_objects: Vec<regex::Regex>,
        acquire_timeout: Duration,
    ) -> Result<Arc<Self>, Error> {
        let router = Arc::new(Self {
            pool,
            namespaces,
            excluded_objects,
            acquire_timeout,
            state: ArcSwap::from_pointee(RouterState {
                schema: Arc::new(SchemaModel::default()),
                registry: Arc::new(TypeRegistry::default()),
            }),
            rebuild_lock: Mutex::new(()),
        });
        router.rebuild().await?;
        Ok(router)
    }

    pub fn current(&self) -> Arc<RouterState> {
        self.state.load_full()
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Hot-swap protocol (spec.md §4.F): acquire the rebuild mutex,
    /// introspect into a fresh `SchemaModel`, build a fresh
    /// `TypeRegistry`, then atomically publish. In-flight requests that
    /// already loaded the old `Arc<RouterState>` keep using it for their
    /// entire lifetime — `ArcSwap::load_full` clones the `Arc`, so the old
    /// state outlives the swap until the last holder drops it. On failure
    /// the previous state is retained untouched and the caller should retry
    /// on the next DDL notification or the reconciliation timer.
    pub async fn rebuild(&self) -> Result<(), Error> {
        let _guard = self.rebuild_lock.lock().await;

        let mut client = pgcat_postgres::acquire(&self.pool, self.acquire_timeout)
            .await
            .map_err(|e| Error::Unavailable(format!("no pooled connection for rebuild: {e}")))?;

        // spec.md §4.B: the model must reflect one catalog instant, so the
        // whole introspection runs inside a single REPEATABLE READ
        // transaction rather than several independently-committed queries.
        let txn = client
            .transaction()
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        txn.batch_execute("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        let filter = IntrospectionFilter {
            namespaces: &self.namespaces,
            excluded_objects: &self.excluded_objects,
        };
        let schema = introspect_schema(&*txn, &filter).await?;
        txn.commit().await.map_err(|e| Error::Internal(e.to_string()))?;
        let registry = TypeRegistry::from_schema_model(&schema);

        self.state.store(Arc::new(RouterState {
            schema: Arc::new(schema),
            registry: Arc::new(registry),
        }));

        tracing::info!("schema router rebuilt resolver set");
        Ok(())
    }

    /// Periodic reconciliation timer (spec.md §4.F, default 60s): a
    /// backstop in case a DDL notification was ever missed.
    pub fn spawn_reconciliation_timer(self: &Arc<Self>, interval: Duration) {
        let router = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                if let Err(err) = router.rebuild().await {
                    tracing::warn!(error = %err, "scheduled reconciliation rebuild failed, retaining previous resolver set");
                }
            }
        });
    }

    /// Consumes rebuild signals forwarded by the DDL watcher's listener
    /// connection (already debounced there) and triggers a rebuild for each.
    pub fn spawn_watch_consumer(
        self: &Arc<Self>,
        mut signals: mpsc::Receiver<pgcat_postgres::RebuildSignal>,
    ) {
        let router = Arc::clone(self);
        tokio::spawn(async move {
            while signals.recv().await.is_some() {
                if let Err(err) = router.rebuild().await {
                    tracing::warn!(error = %err, "ddl-triggered rebuild failed, retaining previous resolver set");
                }
            }
        });
    }
}
