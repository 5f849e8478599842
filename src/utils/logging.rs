/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use crate::config::{Config, OutputPaths, RunMode};
use crate::orchestrator::RunSummary;
use tracing::info;

/// 记录程序启动信息
pub fn log_startup(mode: RunMode, config: &Config) {
    let title = match mode {
        RunMode::Submit => "Pastec 批量索引",
        RunMode::Query => "Pastec 批量搜索",
    };
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {} ({})", title, mode.label());
    info!("📄 源 CSV: {}", config.source_csv.display());
    info!("📂 图片目录: {}", config.base_path.display());
    info!("📊 每批数量: {}", config.batch_size);
    if mode == RunMode::Submit {
        info!("💾 每 {} 张保存一次索引", config.save_interval);
    }
    info!("{}", "=".repeat(60));
}

/// 记录工作项加载信息
///
/// # 参数
/// - `total`: 待处理图片数
/// - `batch_size`: 每批数量
pub fn log_items_loaded(total: usize, batch_size: usize) {
    info!("✓ 共 {} 张待处理的图片", total);
    info!("📋 将以每批 {} 张的方式处理", batch_size);
    info!("💡 每批完成后再开始下一批\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始图片序号
/// - `end`: 结束图片序号
/// - `total`: 图片总数
pub fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批图片: {}-{} / 共 {} 张", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(mode: RunMode, summary: &RunSummary, paths: &OutputPaths) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 已处理: {}/{} (源记录 {})", summary.processed, summary.total_items, summary.total_records);
    info!("📦 批次数: {}", summary.batches);
    info!("✅ 成功: {}", summary.success);
    info!("❌ 失败: {}", summary.failed);
    info!("🔍 文件缺失: {}", summary.missing);
    match mode {
        RunMode::Submit => info!("💾 保存索引: {} 次", summary.checkpoints),
        RunMode::Query => info!("🖼️ 找到匹配: {} 条", summary.matches),
    }
    if summary.stopped_at_cap {
        info!("🧪 测试模式达到上限，提前停止");
    }
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", paths.results_csv.display());
    info!("日志已保存至: {}", paths.log_file.display());
    if let Some(missing) = &paths.missing_files_log {
        info!("缺失文件日志: {}", missing.display());
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abc", 5), "abc");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        // 按字符而不是字节截断
        assert_eq!(truncate_text("图片索引服务", 2), "图片...");
    }
}
