//! 批次调度器 - 编排层
//!
//! 把工作项按固定大小切成连续批次。一批内所有请求同时发出，
//! 然后在批次屏障处等待全部完成，才开始下一批；批次之间不重叠。

use crate::config::RunMode;
use crate::models::{DispatchOutcome, WorkItem};
use crate::services::RequestDispatcher;
use futures::future::join_all;
use tracing::info;

/// 一个批次（只在一次调度周期内存在）
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// 批次编号（从1开始）
    pub number: usize,
    /// 首个工作项在全部工作项中的下标
    pub start: usize,
    pub items: &'a [WorkItem],
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 最后一个工作项的序号（从1开始）
    pub fn end(&self) -> usize {
        self.start + self.items.len()
    }
}

/// 一批的处理结果
#[derive(Debug, Default)]
pub struct BatchReport {
    /// 与分发顺序一致
    pub outcomes: Vec<DispatchOutcome>,
    /// search 模式下因本地文件缺失而未分发的数量
    pub skipped: usize,
}

/// 批次调度器
pub struct BatchScheduler {
    batch_size: usize,
}

impl BatchScheduler {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 批次总数 = ceil(N / B)
    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size)
    }

    /// 按顺序切分批次，除最后一批外大小都等于 batch_size
    pub fn partition<'a>(&self, items: &'a [WorkItem]) -> impl Iterator<Item = Batch<'a>> + 'a {
        let batch_size = self.batch_size;
        items
            .chunks(batch_size)
            .enumerate()
            .map(move |(idx, chunk)| Batch {
                number: idx + 1,
                start: idx * batch_size,
                items: chunk,
            })
    }

    /// 并发分发一批并等待全部完成
    ///
    /// search 模式下本地不存在的文件在分发前跳过。
    /// 结果按工作项顺序返回，每个结果带有来源工作项的 ID。
    pub async fn run_batch(&self, dispatcher: &RequestDispatcher, batch: &Batch<'_>) -> BatchReport {
        let mut skipped = 0;
        let mut to_dispatch = Vec::with_capacity(batch.len());

        for item in batch.items {
            if dispatcher.mode() == RunMode::Query && !item.resource_exists() {
                info!("文件不存在，跳过: {}", item.path_display());
                skipped += 1;
                continue;
            }
            to_dispatch.push(item);
        }

        let outcomes = join_all(to_dispatch.iter().map(|item| dispatcher.dispatch(item))).await;

        BatchReport { outcomes, skipped }
    }
}
