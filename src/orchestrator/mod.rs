//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量图片处理器
//! - 管理一次运行的生命周期（初始化、运行、统计）
//! - 加载工作项，测试模式下截断
//! - 写入结果、记录缺失文件、触发索引保存
//!
//! ### `batch_scheduler` - 批次调度器
//! - 按固定大小切分批次
//! - 一批内并发分发，批次之间严格串行
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<WorkItem>)
//!     ↓
//! batch_scheduler (处理一个 Batch)
//!     ↓
//! services::RequestDispatcher (处理单个 WorkItem)
//!     ↓
//! clients::IndexClient (HTTP)
//! ```

pub mod batch_processor;
pub mod batch_scheduler;

// 重新导出主要类型
pub use batch_processor::{App, RunState, RunSummary};
pub use batch_scheduler::{Batch, BatchReport, BatchScheduler};
