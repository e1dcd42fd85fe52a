//! 在线状态清理任务
//!
//! 按固定周期扫描参与者，移除超过心跳阈值的参与者并广播离开消息。
//! 单个参与者处理失败只记录日志，不影响本轮其余参与者。

use std::{sync::Arc, time::Duration};

use config::PresenceConfig;
use domain::{ParticipantName, PresenceEvent};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    error::ApplicationError,
    services::{MessageService, ParticipantService},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperSettings {
    pub period: Duration,
    pub stale_threshold: Duration,
}

impl From<&PresenceConfig> for SweeperSettings {
    fn from(config: &PresenceConfig) -> Self {
        Self {
            period: config.sweep_period(),
            stale_threshold: config.stale_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    pub name: ParticipantName,
    pub error: String,
}

/// 一轮清理的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: Vec<ParticipantName>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty() && self.failures.is_empty()
    }
}

pub struct PresenceSweeper {
    participants: Arc<ParticipantService>,
    messages: Arc<MessageService>,
    clock: Arc<dyn Clock>,
    settings: SweeperSettings,
}

impl PresenceSweeper {
    pub fn new(
        participants: Arc<ParticipantService>,
        messages: Arc<MessageService>,
        clock: Arc<dyn Clock>,
        settings: SweeperSettings,
    ) -> Self {
        Self {
            participants,
            messages,
            clock,
            settings,
        }
    }

    /// 执行一轮清理。只有读取参与者列表失败时才返回错误。
    pub async fn sweep(&self) -> Result<SweepReport, ApplicationError> {
        let now = self.clock.now();
        let stale: Vec<ParticipantName> = self
            .participants
            .list()
            .await?
            .into_iter()
            .filter(|p| p.is_stale(now, self.settings.stale_threshold))
            .map(|p| p.name)
            .collect();

        let mut report = SweepReport::default();
        for name in stale {
            match self.evict_one(&name).await {
                Ok(true) => report.evicted.push(name),
                Ok(false) => debug!(name = %name, "参与者已刷新心跳或已被移除，跳过"),
                Err(err) => {
                    warn!(name = %name, error = %err, "清理参与者失败");
                    report.failures.push(SweepFailure {
                        name,
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// 离开消息在移除成功后写入；消息写入失败时参与者不会恢复。
    async fn evict_one(&self, name: &ParticipantName) -> Result<bool, ApplicationError> {
        if !self
            .participants
            .evict_if_stale(name, self.settings.stale_threshold)
            .await?
        {
            return Ok(false);
        }
        self.messages
            .record_presence(name, PresenceEvent::Left)
            .await?;
        info!(name = %name, "参与者心跳超时，已移出房间");
        Ok(true)
    }

    /// 按周期运行直到 `shutdown` 被取消。第一轮在启动一个周期之后执行。
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.settings.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(
            period_ms = self.settings.period.as_millis() as u64,
            stale_threshold_ms = self.settings.stale_threshold.as_millis() as u64,
            "在线状态清理任务启动"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("在线状态清理任务停止");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok(report) if !report.is_empty() => info!(
                            evicted = report.evicted.len(),
                            failed = report.failures.len(),
                            "清理完成"
                        ),
                        Ok(_) => {}
                        Err(err) => error!(error = %err, "读取参与者列表失败，本轮清理跳过"),
                    }
                }
            }
        }
    }

    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
