use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// 运行模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// 提交图片到索引（add）
    Submit,
    /// 以图搜图（search）
    Query,
}

impl RunMode {
    pub fn label(&self) -> &'static str {
        match self {
            RunMode::Submit => "add",
            RunMode::Query => "search",
        }
    }
}

/// CSV 列名映射（按实际 CSV 结构修改）
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// 图片 ID 列
    pub id: String,
    /// 文件名列
    pub filename: String,
    /// 文件夹列（可缺省）
    pub folder: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: "ID".to_string(),
            filename: "Filename".to_string(),
            folder: "Folder".to_string(),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 源 CSV 文件
    pub source_csv: PathBuf,
    /// 图片根目录
    pub base_path: PathBuf,
    pub columns: ColumnMapping,
    /// 每批并发请求数量，100 是实测吞吐最佳值
    pub batch_size: usize,
    /// 每处理多少张图片保存一次索引
    pub save_interval: usize,
    /// 测试模式：只处理前 `test_limit` 张
    pub test_mode: bool,
    pub test_limit: usize,
    // --- Pastec 接口配置 ---
    pub images_url: String,
    pub search_url: String,
    pub io_url: String,
    /// 保存索引时传给服务端的路径（需在容器内可访问）
    pub index_path: String,
    pub content_type: String,
    /// 单个请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 输出目录 ---
    pub add_log_dir: PathBuf,
    pub search_log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_csv: PathBuf::from("images.csv"),
            base_path: PathBuf::from("/path/to/images"),
            columns: ColumnMapping::default(),
            batch_size: 100,
            save_interval: 1000,
            test_mode: false,
            test_limit: 100,
            images_url: "http://localhost:4212/index/images/".to_string(),
            search_url: "http://localhost:4212/index/searcher".to_string(),
            io_url: "http://localhost:4212/index/io".to_string(),
            index_path: "/pastec/build/pastec-index/pastec_index.dat".to_string(),
            content_type: "image/jpeg".to_string(),
            request_timeout_secs: 300,
            add_log_dir: PathBuf::from("Add_log"),
            search_log_dir: PathBuf::from("Search_log"),
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（可选）→ 环境变量
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        match config_file {
            Some(path) => Ok(Self::from_toml_file(path)?.with_env_overrides()),
            None => Ok(Self::from_env()),
        }
    }

    /// 从 TOML 文件加载，未出现的字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))?;
        Ok(config)
    }

    /// 用环境变量覆盖当前配置
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        let env = |name: &str| std::env::var(name).ok();
        Self {
            source_csv: env("PASTEC_SOURCE_CSV").map(PathBuf::from).unwrap_or(self.source_csv),
            base_path: env("PASTEC_BASE_PATH").map(PathBuf::from).unwrap_or(self.base_path),
            columns: ColumnMapping {
                id: env("PASTEC_ID_COLUMN").unwrap_or(self.columns.id),
                filename: env("PASTEC_FILENAME_COLUMN").unwrap_or(self.columns.filename),
                folder: env("PASTEC_FOLDER_COLUMN").unwrap_or(self.columns.folder),
            },
            batch_size: env("PASTEC_BATCH_SIZE").and_then(|v| v.parse().ok()).unwrap_or(self.batch_size),
            save_interval: env("PASTEC_SAVE_INTERVAL").and_then(|v| v.parse().ok()).unwrap_or(self.save_interval),
            test_mode: env("PASTEC_TEST_MODE").and_then(|v| v.parse().ok()).unwrap_or(self.test_mode),
            test_limit: env("PASTEC_TEST_LIMIT").and_then(|v| v.parse().ok()).unwrap_or(self.test_limit),
            images_url: env("PASTEC_IMAGES_URL").unwrap_or(self.images_url),
            search_url: env("PASTEC_SEARCH_URL").unwrap_or(self.search_url),
            io_url: env("PASTEC_IO_URL").unwrap_or(self.io_url),
            index_path: env("PASTEC_INDEX_PATH").unwrap_or(self.index_path),
            content_type: env("PASTEC_CONTENT_TYPE").unwrap_or(self.content_type),
            request_timeout_secs: env("PASTEC_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.request_timeout_secs),
            add_log_dir: env("PASTEC_ADD_LOG_DIR").map(PathBuf::from).unwrap_or(self.add_log_dir),
            search_log_dir: env("PASTEC_SEARCH_LOG_DIR").map(PathBuf::from).unwrap_or(self.search_log_dir),
        }
    }

    /// 校验配置，任何一项不合法都会在开始处理前终止运行
    pub fn validate(&self) -> Result<(), AppError> {
        if self.batch_size == 0 {
            return Err(AppError::InvalidConfig("batch_size 必须大于 0".to_string()));
        }
        if self.test_mode && self.test_limit == 0 {
            return Err(AppError::InvalidConfig("test_limit 必须大于 0".to_string()));
        }
        for (name, url) in [
            ("images_url", &self.images_url),
            ("search_url", &self.search_url),
            ("io_url", &self.io_url),
        ] {
            if url.trim().is_empty() {
                return Err(AppError::InvalidConfig(format!("{} 不能为空", name)));
            }
        }
        Ok(())
    }
}

/// 某个模式下的所有输出文件位置
#[derive(Clone, Debug)]
pub struct OutputPaths {
    pub dir: PathBuf,
    /// 运行日志
    pub log_file: PathBuf,
    /// 缺失文件日志（仅 add 模式）
    pub missing_files_log: Option<PathBuf>,
    /// 结果 CSV
    pub results_csv: PathBuf,
}

impl OutputPaths {
    pub fn for_mode(config: &Config, mode: RunMode) -> Self {
        match mode {
            RunMode::Submit => {
                let dir = config.add_log_dir.clone();
                Self {
                    log_file: dir.join("pastec_batch_index_add_log.txt"),
                    missing_files_log: Some(dir.join("pastec_batch_index_add_missing_files_log.txt")),
                    results_csv: dir.join("pastec_batch_index_add_log_results.csv"),
                    dir,
                }
            }
            RunMode::Query => {
                let dir = config.search_log_dir.clone();
                Self {
                    log_file: dir.join("pastec_search_log.txt"),
                    missing_files_log: None,
                    results_csv: dir.join("pastec_search_results.csv"),
                    dir,
                }
            }
        }
    }
}
