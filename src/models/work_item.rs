use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// 源 CSV 中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: String,
    pub filename: String,
    /// 缺省时为空字符串
    pub folder: String,
    /// 其余未映射的列
    pub extra: BTreeMap<String, String>,
}

/// 一张待处理的图片
///
/// 加载后只读，处理完所在批次后即丢弃。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 外部分配的 ID，运行内可能重复，不做去重
    pub id: String,
    pub filename: String,
    pub folder: String,
    /// base_path / folder / filename
    pub resource_path: PathBuf,
    pub metadata: BTreeMap<String, String>,
}

impl WorkItem {
    pub fn new(record: SourceRecord, base_path: &Path) -> Self {
        let mut resource_path = base_path.to_path_buf();
        if !record.folder.is_empty() {
            resource_path.push(&record.folder);
        }
        resource_path.push(&record.filename);

        Self {
            id: record.id,
            filename: record.filename,
            folder: record.folder,
            resource_path,
            metadata: record.extra,
        }
    }

    /// 本地文件是否存在
    pub fn resource_exists(&self) -> bool {
        self.resource_path.is_file()
    }

    pub fn path_display(&self) -> String {
        self.resource_path.display().to_string()
    }
}

impl Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[图片 ID#{} {}]", self.id, self.resource_path.display())
    }
}
