use crate::config::LogFormat;

pub fn init(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_new(format!("pgcat={level}"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pgcat=info"));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}
