//! 请求分发 - 业务能力层
//!
//! 每个 `WorkItem` 恰好发一次请求并得到恰好一个 `DispatchOutcome`。
//! 任何失败（文件缺失、非 200、网络错误、解析失败）都在这里转成结果，不会向上抛出。

use crate::clients::{IndexClient, RawResponse};
use crate::config::RunMode;
use crate::models::{exclude_self_matches, DispatchOutcome, OutcomeKind, SearchResponse, WorkItem};
use crate::services::response_parser::ResponseParser;
use crate::utils::logging::truncate_text;
use std::io::ErrorKind;
use tracing::{debug, info, warn};

/// 请求分发器
pub struct RequestDispatcher {
    client: IndexClient,
    mode: RunMode,
    parser: ResponseParser,
}

impl RequestDispatcher {
    pub fn new(client: IndexClient, mode: RunMode) -> Self {
        Self::with_parser(client, mode, ResponseParser::default())
    }

    pub fn with_parser(client: IndexClient, mode: RunMode, parser: ResponseParser) -> Self {
        Self {
            client,
            mode,
            parser,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// 处理单张图片
    pub async fn dispatch(&self, item: &WorkItem) -> DispatchOutcome {
        match self.mode {
            RunMode::Submit => self.submit(item).await,
            RunMode::Query => self.query(item).await,
        }
    }

    /// 提交图片到索引
    ///
    /// 本地文件缺失时直接返回 `ResourceMissing`，不发请求。
    pub async fn submit(&self, item: &WorkItem) -> DispatchOutcome {
        let data = match self.read_resource(item).await {
            Ok(data) => data,
            Err(outcome) => return outcome,
        };

        match self.client.add_image(&item.id, data).await {
            Ok(response) => {
                let kind = if response.is_ok() {
                    OutcomeKind::Success
                } else {
                    OutcomeKind::RemoteError
                };
                DispatchOutcome::new(item, kind, Some(response.status), response.body)
            }
            Err(e) => DispatchOutcome::transport_error(item, e.to_string()),
        }
    }

    /// 以图搜图，结果中已排除自匹配
    ///
    /// 非 200 或带 error 字段的响应只记录日志，返回零条匹配。
    pub async fn query(&self, item: &WorkItem) -> DispatchOutcome {
        let data = match self.read_resource(item).await {
            Ok(data) => data,
            Err(outcome) => return outcome,
        };

        let response = match self.client.search_image(data).await {
            Ok(response) => response,
            Err(e) => return DispatchOutcome::transport_error(item, e.to_string()),
        };
        debug!("{} 原始响应: {}", item, response.body);

        if !response.is_ok() {
            warn!("[{}] ⚠️ 搜索失败: HTTP {}", item.id, response.status);
            return DispatchOutcome::new(
                item,
                OutcomeKind::RemoteError,
                Some(response.status),
                response.body,
            );
        }

        self.interpret_search(item, response)
    }

    fn interpret_search(&self, item: &WorkItem, response: RawResponse) -> DispatchOutcome {
        let value = match self.parser.parse(&response.body) {
            Ok(value) => value,
            Err(e) => {
                warn!("[{}] ⚠️ {}", item.id, e);
                return DispatchOutcome::new(
                    item,
                    OutcomeKind::TransportError,
                    Some(response.status),
                    format!("{} (原始响应: {})", e, truncate_text(&response.body, 200)),
                );
            }
        };

        match SearchResponse::interpret(&value) {
            SearchResponse::Results { matches, dropped } => {
                if dropped > 0 {
                    warn!("[{}] 丢弃 {} 条缺少字段的匹配", item.id, dropped);
                }
                let (matches, excluded) = exclude_self_matches(&item.id, matches);
                if excluded > 0 {
                    info!("[{}] 跳过自匹配 {} 条", item.id, excluded);
                }
                DispatchOutcome::new(item, OutcomeKind::Success, Some(response.status), response.body)
                    .with_matches(matches)
            }
            SearchResponse::Error(message) => {
                warn!("[{}] ⚠️ 服务端返回错误: {}", item.id, message);
                DispatchOutcome::new(item, OutcomeKind::RemoteError, Some(response.status), response.body)
            }
            SearchResponse::Other(kind) => {
                warn!("[{}] ⚠️ 非搜索结果响应: {}", item.id, kind);
                DispatchOutcome::new(item, OutcomeKind::RemoteError, Some(response.status), response.body)
            }
        }
    }

    /// 路径不是普通文件（不存在或是目录）时视为缺失
    async fn read_resource(&self, item: &WorkItem) -> Result<Vec<u8>, DispatchOutcome> {
        if !item.resource_exists() {
            return Err(DispatchOutcome::resource_missing(item));
        }
        match tokio::fs::read(&item.resource_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DispatchOutcome::resource_missing(item)),
            Err(e) => Err(DispatchOutcome::transport_error(
                item,
                format!("无法读取文件 {}: {}", item.path_display(), e),
            )),
        }
    }
}
