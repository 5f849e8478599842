//! 结果写入 - 业务能力层
//!
//! 每批处理完立即追加到结果 CSV 并刷盘，崩溃时已完成批次的结果不会丢失。
//! 表头只在文件不存在或为空时写一次；追加不做去重。

use crate::error::{AppError, AppResult};
use crate::models::DispatchOutcome;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 结果写入
pub trait ResultSink: Send {
    /// 追加一批结果，返回写入的行数
    fn append(&mut self, outcomes: &[DispatchOutcome]) -> AppResult<usize>;

    fn path(&self) -> &Path;
}

/// add 模式的结果行
#[derive(Debug, Serialize)]
struct SubmitRow<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    filename: &'a str,
    status: &'a str,
    response: &'a str,
    timestamp: &'a str,
}

/// search 模式的结果行
#[derive(Debug, Serialize)]
struct SearchRow<'a> {
    #[serde(rename = "Source_ID")]
    source_id: &'a str,
    #[serde(rename = "Source_Path")]
    source_path: &'a str,
    #[serde(rename = "Matched_Image_ID")]
    matched_image_id: &'a str,
    #[serde(rename = "Match_Score")]
    match_score: f64,
    #[serde(rename = "Match_Tag")]
    match_tag: &'a str,
}

/// add 模式：每张图片一行
pub struct SubmitResultSink {
    path: PathBuf,
}

impl SubmitResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for SubmitResultSink {
    fn append(&mut self, outcomes: &[DispatchOutcome]) -> AppResult<usize> {
        let rows = outcomes.iter().map(|o| SubmitRow {
            id: &o.item_id,
            filename: &o.filename,
            status: o.kind.as_str(),
            response: &o.payload,
            timestamp: &o.timestamp,
        });
        append_rows(&self.path, rows)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// search 模式：每条保留下来的匹配一行，没有匹配的图片不写任何行
pub struct SearchResultSink {
    path: PathBuf,
}

impl SearchResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for SearchResultSink {
    fn append(&mut self, outcomes: &[DispatchOutcome]) -> AppResult<usize> {
        let rows = outcomes.iter().flat_map(|o| {
            o.matches.iter().map(move |m| SearchRow {
                source_id: &o.item_id,
                source_path: &o.resource_path,
                matched_image_id: &m.matched_id,
                match_score: m.score,
                match_tag: m.tag.as_deref().unwrap_or(""),
            })
        });
        append_rows(&self.path, rows)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn append_rows<T: Serialize>(path: &Path, rows: impl Iterator<Item = T>) -> AppResult<usize> {
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let path_label = path.display().to_string();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::sink(&path_label, e))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);

    let mut written = 0;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::sink(&path_label, e))?;
        written += 1;
    }
    writer.flush().map_err(|e| AppError::sink(&path_label, e))?;

    debug!("追加 {} 行到 {}", written, path_label);
    Ok(written)
}
