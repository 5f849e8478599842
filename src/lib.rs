//! # Pastec Batch
//!
//! 一个用于向 Pastec 图片索引服务批量添加、批量搜索图片的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 只负责 HTTP 往返，不做任何判断
//! - `IndexClient` - 添加图片、搜索图片、保存索引
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单张图片或单批结果
//! - `RequestDispatcher` - 一张图片 → 一个 `DispatchOutcome`
//! - `ResponseParser` - JSON / 宽松字面量两级解析
//! - `CheckpointManager` - 按处理量保存索引
//! - `ResultSink` - 结果 CSV 追加写入
//! - `MissingFileWriter` - 写缺失文件日志
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_scheduler` - 切分批次，批内并发、批间串行
//! - `orchestrator/batch_processor` - 一次完整运行：加载 → 分批 → 写结果 → 保存索引 → 统计
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::IndexClient;
pub use config::{Config, OutputPaths, RunMode};
pub use error::{AppError, AppResult};
pub use models::{DispatchOutcome, MatchRecord, OutcomeKind, WorkItem, WorkSource};
pub use orchestrator::{App, BatchScheduler, RunSummary};
pub use services::{CheckpointManager, RequestDispatcher, ResultSink};
