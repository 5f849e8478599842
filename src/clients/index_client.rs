/// Pastec 索引 API 客户端
///
/// 封装所有与索引服务的 HTTP 交互，每个方法只发一次请求，不重试。
use crate::config::Config;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// 服务端原始响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// 索引 API 客户端
///
/// `reqwest::Client` 内部是 `Arc`，clone 后共享同一个连接池。
#[derive(Clone)]
pub struct IndexClient {
    http: Client,
    images_url: String,
    search_url: String,
    io_url: String,
    content_type: String,
}

impl IndexClient {
    /// 创建新的索引客户端
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            images_url: config.images_url.clone(),
            search_url: config.search_url.clone(),
            io_url: config.io_url.clone(),
            content_type: config.content_type.clone(),
        })
    }

    /// 单张图片的添加地址
    pub fn image_url(&self, image_id: &str) -> String {
        format!("{}/{}", self.images_url.trim_end_matches('/'), image_id)
    }

    /// 添加图片到索引
    ///
    /// # 参数
    /// - `image_id`: 图片 ID
    /// - `data`: 图片原始字节
    pub async fn add_image(&self, image_id: &str, data: Vec<u8>) -> Result<RawResponse, reqwest::Error> {
        let url = self.image_url(image_id);
        debug!("POST 图片 {} ({} 字节) -> {}", image_id, data.len(), url);

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, self.content_type.as_str())
            .body(data)
            .send()
            .await?;

        read_response(response).await
    }

    /// 以图搜图
    pub async fn search_image(&self, data: Vec<u8>) -> Result<RawResponse, reqwest::Error> {
        let response = self.http.post(&self.search_url).body(data).send().await?;

        read_response(response).await
    }

    /// 让服务端把内存中的索引写入磁盘
    ///
    /// # 参数
    /// - `index_path`: 服务端可访问的索引文件路径
    pub async fn write_index(&self, index_path: &str) -> Result<RawResponse, reqwest::Error> {
        let payload = json!({
            "type": "WRITE",
            "index_path": index_path
        });

        let response = self.http.post(&self.io_url).json(&payload).send().await?;

        read_response(response).await
    }
}

async fn read_response(response: reqwest::Response) -> Result<RawResponse, reqwest::Error> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(RawResponse { status, body })
}
