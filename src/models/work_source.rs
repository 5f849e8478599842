//! 工作来源
//!
//! 把源记录转换为 `WorkItem` 序列，输出顺序与输入一致。
//! 这里不检查文件是否存在，存在性检查推迟到分发时。

use crate::models::work_item::{SourceRecord, WorkItem};
use std::path::PathBuf;

/// 工作来源
pub struct WorkSource {
    base_path: PathBuf,
}

impl WorkSource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// 按输入顺序生成工作项，重复 ID 原样透传
    pub fn load(&self, records: Vec<SourceRecord>) -> Vec<WorkItem> {
        records
            .into_iter()
            .map(|record| WorkItem::new(record, &self.base_path))
            .collect()
    }

    /// 测试模式下截断到前 `limit` 个
    pub fn bounded(items: Vec<WorkItem>, limit: Option<usize>) -> Vec<WorkItem> {
        match limit {
            Some(limit) => items.into_iter().take(limit).collect(),
            None => items,
        }
    }
}
