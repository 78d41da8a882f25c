mod cli;
mod echo;
mod repl;

use std::path::Path;
use std::sync::Arc;

use parley_common::SessionId;
use parley_config::schema::ParleyConfig;
use parley_session::{JsonFilePersistence, Orchestrator, OrchestratorConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG: &str = "parley=info";

/// `--log-level` wins, then `[logging].level`, then the default.
fn log_directive(flag: Option<&str>, config: Option<&ParleyConfig>) -> String {
    match (flag, config) {
        (Some(flag), _) => flag.to_string(),
        (None, Some(config)) => format!("parley={}", config.logging.level.as_directive()),
        (None, None) => DEFAULT_LOG.to_string(),
    }
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let args = cli::parse();

    // Config is read before logging so `[logging].level` can apply.
    let loaded = match args.config {
        Some(ref path) => parley_config::toml_loader::load_from_path(Path::new(path)),
        None => parley_config::load_config(),
    };

    init_logging(&log_directive(args.log_level.as_deref(), loaded.as_ref().ok()));

    tracing::info!("Parley v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {path}");
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        ParleyConfig::default()
    });

    let storage = match config.session.storage_dir.clone() {
        Some(dir) => Some(dir),
        None => match parley_config::toml_loader::default_sessions_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                tracing::warn!("Sessions will not be saved: {e}");
                None
            }
        },
    };

    let mut builder = Orchestrator::builder(Arc::new(echo::EchoProvider::default()))
        .config(OrchestratorConfig::from(&config));
    if let Some(dir) = storage {
        tracing::info!("Session storage: {}", dir.display());
        builder = builder.persistence(Arc::new(JsonFilePersistence::new(dir)));
    }
    if let Some(id) = args.session {
        builder = builder.resume(SessionId::from(id));
    }
    let handle = builder.spawn();

    if let Err(e) = repl::run(&handle).await {
        tracing::error!("REPL error: {e}");
    }
    if let Err(e) = handle.shutdown().await {
        tracing::error!("Shutdown failed: {e}");
    }
    tracing::info!("Shutdown complete");
}

#[cfg(test)]
mod tests {
    use parley_config::schema::LogLevel;

    use super::*;

    #[test]
    fn flag_overrides_config_level() {
        let mut config = ParleyConfig::default();
        config.logging.level = LogLevel::Debug;
        assert_eq!(
            log_directive(Some("parley_session=trace"), Some(&config)),
            "parley_session=trace"
        );
    }

    #[test]
    fn config_level_applies_without_flag() {
        let mut config = ParleyConfig::default();
        config.logging.level = LogLevel::Warning;
        assert_eq!(log_directive(None, Some(&config)), "parley=warn");
    }

    #[test]
    fn default_when_config_failed_to_load() {
        assert_eq!(log_directive(None, None), "parley=info");
    }
}
