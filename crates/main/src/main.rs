//! 主应用程序入口
//!
//! 装配存储、服务和后台清理任务，然后启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    Clock, MessageService, MessageServiceDependencies, NameLocks, ParticipantService,
    ParticipantServiceDependencies, PresenceSweeper, SweeperSettings, SystemClock,
};
use config::AppConfig;
use infrastructure::Infrastructure;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(config = %config.sanitize(), "配置加载完成");

    let infrastructure = Infrastructure::connect(&config.database).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 创建应用层服务
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository: infrastructure.messages.clone(),
        participant_repository: infrastructure.participants.clone(),
        clock: clock.clone(),
        unregistered_sender: config.messaging.unregistered_sender,
    }));
    let participant_service = Arc::new(ParticipantService::new(ParticipantServiceDependencies {
        participant_repository: infrastructure.participants.clone(),
        message_service: message_service.clone(),
        clock: clock.clone(),
        locks: Arc::new(NameLocks::new()),
    }));

    // 后台在线状态清理
    let shutdown = CancellationToken::new();
    let sweeper = Arc::new(PresenceSweeper::new(
        participant_service.clone(),
        message_service.clone(),
        clock,
        SweeperSettings::from(&config.presence),
    ));
    let sweeper_handle = sweeper.spawn(shutdown.clone());

    let state = AppState::new(participant_service, message_service);
    let app = router(state, &config.server.cors_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("聊天室服务器启动在 http://{}", addr);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("收到退出信号"),
                _ = server_shutdown.cancelled() => {}
            }
        })
        .await?;

    shutdown.cancel();
    if let Err(err) = sweeper_handle.await {
        tracing::error!(error = %err, "清理任务异常退出");
    }
    tracing::info!("服务已停止");

    Ok(())
}
