pub mod api_error;
pub mod app;
pub mod config;
pub mod envelope;
pub mod logging;
pub mod query_string;
pub mod resolvers;
pub mod router;
pub mod state;

pub use api_error::ApiError;
pub use config::Config;
pub use router::SchemaRouter;
pub use state::AppState;
