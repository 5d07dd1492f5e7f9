//! 日志与指标初始化

use crate::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 初始化 tracing subscriber
///
/// `RUST_LOG` 优先，其次使用 `logging.level`。`json` 用于生产环境，`pretty` 用于本地开发。
pub fn init_telemetry(config: &AppConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_layer = match config.logging.format.to_lowercase().as_str() {
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.logging.level,
        format = %config.logging.format,
        "Telemetry initialized"
    );
}

/// 同步指标在首次使用时自动注册，这里只描述它们
pub fn describe_metrics() {
    metrics::describe_counter!("sync.started", "Syncs accepted and marked running");
    metrics::describe_counter!("sync.completed", "Syncs that reached the completed state");
    metrics::describe_counter!("sync.failed", "Syncs that reached the failed state");
    metrics::describe_counter!(
        "sync.records_processed",
        "Records written by finished syncs"
    );
}
