//! 索引保存 - 业务能力层
//!
//! 仅用于 add 模式。累计处理数（成功和失败都算）每跨过一次 `interval` 的整数倍，
//! 就让服务端保存一次索引；运行正常结束时再无条件保存一次。
//! 保存失败只记录日志，不中断运行。

use crate::clients::IndexClient;
use tracing::{error, info, warn};

/// 触发保存的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointReason {
    /// 处理数跨过间隔
    Interval,
    /// 测试模式达到上限
    TestCap,
    /// 正常结束
    Final,
}

/// 单次保存的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointStatus {
    /// 服务端返回 200
    Saved(String),
    /// 服务端返回非 200
    Rejected { status: u16, body: String },
    /// 网络错误
    Failed(String),
}

impl CheckpointStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, CheckpointStatus::Saved(_))
    }
}

/// 索引保存管理器
pub struct CheckpointManager {
    client: IndexClient,
    index_path: String,
    interval: usize,
    processed: usize,
    issued: usize,
}

impl CheckpointManager {
    /// `interval` 为 0 时不做间隔保存
    pub fn new(client: IndexClient, index_path: impl Into<String>, interval: usize) -> Self {
        Self {
            client,
            index_path: index_path.into(),
            interval,
            processed: 0,
            issued: 0,
        }
    }

    /// 累加处理数，返回本次跨过的间隔倍数个数
    pub fn advance(&mut self, newly_processed: usize) -> usize {
        let previous = self.processed;
        self.processed += newly_processed;
        crossings(previous, self.processed, self.interval)
    }

    /// 累加处理数，每跨过一次间隔就保存一次
    pub async fn record_processed(&mut self, newly_processed: usize) -> Vec<CheckpointStatus> {
        let due = self.advance(newly_processed);
        let mut statuses = Vec::with_capacity(due);
        for _ in 0..due {
            info!("💾 已处理 {} 张图片，保存索引...", self.processed);
            statuses.push(self.checkpoint(CheckpointReason::Interval).await);
        }
        statuses
    }

    /// 立即保存一次索引
    pub async fn checkpoint(&mut self, reason: CheckpointReason) -> CheckpointStatus {
        self.issued += 1;

        let status = match self.client.write_index(&self.index_path).await {
            Ok(response) if response.is_ok() => CheckpointStatus::Saved(response.body),
            Ok(response) => CheckpointStatus::Rejected {
                status: response.status,
                body: response.body,
            },
            Err(e) => CheckpointStatus::Failed(e.to_string()),
        };

        match &status {
            CheckpointStatus::Saved(body) => info!("✓ 索引保存响应 ({:?}): {}", reason, body),
            CheckpointStatus::Rejected { status, body } => {
                warn!("⚠️ 索引保存被拒绝 ({:?}): HTTP {} {}", reason, status, body)
            }
            CheckpointStatus::Failed(message) => error!("❌ 索引保存失败 ({:?}): {}", reason, message),
        }

        status
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    /// 已发出的保存请求数（含失败）
    pub fn issued(&self) -> usize {
        self.issued
    }
}

/// `previous` 到 `current` 之间跨过的 `interval` 整数倍个数
pub fn crossings(previous: usize, current: usize, interval: usize) -> usize {
    if interval == 0 || current <= previous {
        return 0;
    }
    current / interval - previous / interval
}
