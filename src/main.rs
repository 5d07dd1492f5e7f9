//! 服务主入口

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;

use workspaces_inventory::{
    config::AppConfig,
    crypto::SecretCipher,
    db,
    handlers::health,
    middleware::AppState,
    providers::{AwsProvider, LdapDirectory},
    repository::{
        AccountRepository, InventoryRepository, NotificationRepository, SettingsRepository,
        SyncHistoryRepository,
    },
    routes,
    services::{AccountService, NotificationService, SyncDependencies, SyncService},
    telemetry,
    worker::SyncQueue,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if let Some(arg) = args.get(1) {
        match arg.as_str() {
            "--version" => {
                println!("workspaces-inventory {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("未知参数: {}", other);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    dotenv::from_filename(".env.local").ok();
    dotenv::dotenv().ok();

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // 2. 初始化日志与指标
    telemetry::init_telemetry(&config);
    telemetry::describe_metrics();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "WorkSpaces inventory starting...");

    // 3. 数据库连接池 + 迁移
    let db_pool = db::create_pool(&config.database).await?;
    db::run_migrations(&db_pool).await?;

    // 4. 组装服务
    let cipher = SecretCipher::from_key_material(&config.security.settings_encryption_key);
    let accounts = Arc::new(AccountRepository::new(db_pool.clone()));
    let settings = Arc::new(SettingsRepository::new(db_pool.clone(), cipher.clone()));
    let history = Arc::new(SyncHistoryRepository::new(db_pool.clone()));
    let cloud = Arc::new(AwsProvider::new(config.sync.aws_page_size));
    let directory = Arc::new(LdapDirectory::new(Duration::from_secs(
        config.sync.ldap_connect_timeout_secs,
    )));

    let sync_service = Arc::new(SyncService::new(
        SyncDependencies {
            accounts: accounts.clone(),
            settings: settings.clone(),
            inventory: Arc::new(InventoryRepository::new(db_pool.clone())),
            history: history.clone(),
            cloud: cloud.clone(),
            directory: directory.clone(),
            notifier: Arc::new(NotificationService::new(NotificationRepository::new(
                db_pool.clone(),
            ))),
            cipher: cipher.clone(),
        },
        &config.sync,
    ));
    let (queue, dispatcher) = SyncQueue::start(sync_service, &config.sync);

    let app_state = Arc::new(AppState {
        config: config.clone(),
        db: db_pool.clone(),
        queue,
        history,
        account_service: Arc::new(AccountService::new(
            accounts, settings, cloud, directory, cipher,
        )),
    });

    // 5. 启动服务器
    let app = routes::create_router(app_state);
    let listener = TcpListener::bind(&config.server.addr).await?;
    tracing::info!(addr = %config.server.addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 等待进行中的同步在限定时间内结束
    let grace = Duration::from_secs(config.server.graceful_shutdown_timeout_secs);
    if tokio::time::timeout(grace, dispatcher).await.is_err() {
        tracing::warn!("Graceful shutdown timeout reached, abandoning queued syncs");
    }

    db_pool.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received, starting graceful shutdown"),
        _ = terminate => tracing::info!("Terminate signal received, starting graceful shutdown"),
    }
}

fn print_help() {
    println!("workspaces-inventory {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: workspaces-inventory [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 WSI_ 前缀的环境变量完成，例如 WSI_DATABASE__URL");
}
