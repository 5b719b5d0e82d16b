pub mod binding;
pub mod compiler;
pub mod introspection;
pub mod pool;
pub mod test_db;
pub mod watcher;

pub use binding::{sql_type_hint, to_sql_param, BoxedParam};
pub use compiler::{CompiledStatement, QueryCompiler};
pub use introspection::{introspect_schema, IntrospectionFilter};
pub use pool::{acquire, build_pool, PoolSettings};
pub use watcher::{install as install_watch_schema, run_watch_loop, uninstall as uninstall_watch_schema, RebuildSignal, WatcherSettings};
