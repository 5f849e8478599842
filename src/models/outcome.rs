//! 单张图片的处理结果
//!
//! `DispatchOutcome` 由分发器创建，交给结果写入后不再修改。

use chrono::Local;
use serde_json::Value;
use std::fmt::Display;

use crate::models::work_item::WorkItem;

/// 结果类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// 服务端返回 200
    Success,
    /// 服务端返回非 200 或带 error 字段
    RemoteError,
    /// 本地文件不存在，未发出请求
    ResourceMissing,
    /// 网络错误或响应无法解析
    TransportError,
}

impl OutcomeKind {
    /// 写入结果 CSV 的状态值
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "SUCCESS",
            OutcomeKind::RemoteError => "REMOTE_ERROR",
            OutcomeKind::ResourceMissing => "RESOURCE_MISSING",
            OutcomeKind::TransportError => "TRANSPORT_ERROR",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeKind::Success)
    }
}

impl Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一条搜索匹配
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub matched_id: String,
    pub score: f64,
    pub tag: Option<String>,
}

/// 单张图片的处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub item_id: String,
    pub filename: String,
    pub resource_path: String,
    pub kind: OutcomeKind,
    pub status_code: Option<u16>,
    /// 原始响应或错误描述
    pub payload: String,
    /// 仅搜索模式，已排除自匹配
    pub matches: Vec<MatchRecord>,
    pub timestamp: String,
}

impl DispatchOutcome {
    pub fn new(item: &WorkItem, kind: OutcomeKind, status_code: Option<u16>, payload: impl Into<String>) -> Self {
        Self {
            item_id: item.id.clone(),
            filename: item.filename.clone(),
            resource_path: item.path_display(),
            kind,
            status_code,
            payload: payload.into(),
            matches: Vec::new(),
            timestamp: now_iso(),
        }
    }

    pub fn resource_missing(item: &WorkItem) -> Self {
        Self::new(item, OutcomeKind::ResourceMissing, None, "File not found")
    }

    pub fn transport_error(item: &WorkItem, description: impl Into<String>) -> Self {
        Self::new(item, OutcomeKind::TransportError, None, description)
    }

    pub fn with_matches(mut self, matches: Vec<MatchRecord>) -> Self {
        self.matches = matches;
        self
    }
}

/// 本地时间 ISO-8601（微秒精度）
pub fn now_iso() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// 搜索响应的解读结果
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResponse {
    /// type == SEARCH_RESULTS
    Results {
        matches: Vec<MatchRecord>,
        /// 缺少必须字段被丢弃的条目数
        dropped: usize,
    },
    /// 响应带 error 字段
    Error(String),
    /// 其它类型（如 IMAGE_NOT_DECODED）
    Other(String),
}

impl SearchResponse {
    /// 解读已解析的搜索响应
    ///
    /// 每条结果需要 `image_id` 和 `score`，`tag` 可选；缺字段的条目被丢弃。
    pub fn interpret(value: &Value) -> Self {
        if let Some(error) = value.get("error") {
            return SearchResponse::Error(value_to_text(error));
        }

        let kind = value.get("type").and_then(|v| v.as_str()).unwrap_or("");
        if kind != "SEARCH_RESULTS" {
            let label = if kind.is_empty() { "<无类型>" } else { kind };
            return SearchResponse::Other(label.to_string());
        }

        let mut matches = Vec::new();
        let mut dropped = 0;
        let entries = value
            .get("results")
            .and_then(|v| v.as_array())
            .map(|v| v.as_slice())
            .unwrap_or_default();

        for entry in entries {
            match parse_match(entry) {
                Some(record) => matches.push(record),
                None => dropped += 1,
            }
        }

        SearchResponse::Results { matches, dropped }
    }
}

fn parse_match(entry: &Value) -> Option<MatchRecord> {
    let matched_id = match entry.get("image_id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let score = entry.get("score")?.as_f64()?;
    let tag = entry
        .get("tag")
        .filter(|v| !v.is_null())
        .map(value_to_text);

    Some(MatchRecord {
        matched_id,
        score,
        tag,
    })
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 排除自匹配，返回保留的匹配和被排除的数量
pub fn exclude_self_matches(source_id: &str, matches: Vec<MatchRecord>) -> (Vec<MatchRecord>, usize) {
    let before = matches.len();
    let kept: Vec<MatchRecord> = matches
        .into_iter()
        .filter(|m| m.matched_id != source_id)
        .collect();
    let excluded = before - kept.len();
    (kept, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpret_search_results() {
        let value = json!({
            "type": "SEARCH_RESULTS",
            "results": [
                {"image_id": 42, "score": 0.9, "tag": "cover"},
                {"image_id": "7", "score": 0.5}
            ]
        });

        let SearchResponse::Results { matches, dropped } = SearchResponse::interpret(&value) else {
            panic!("应解读为 SEARCH_RESULTS");
        };
        assert_eq!(dropped, 0);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].matched_id, "42");
        assert_eq!(matches[0].tag.as_deref(), Some("cover"));
        assert_eq!(matches[1].matched_id, "7");
        assert_eq!(matches[1].tag, None);
    }

    #[test]
    fn test_interpret_drops_incomplete_entries() {
        let value = json!({
            "type": "SEARCH_RESULTS",
            "results": [
                {"image_id": 1},
                {"score": 0.3},
                {"image_id": 3, "score": "high"},
                {"image_id": 4, "score": 12}
            ]
        });

        match SearchResponse::interpret(&value) {
            SearchResponse::Results { matches, dropped } => {
                assert_eq!(dropped, 3);
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].score, 12.0);
            }
            other => panic!("意外的解读结果: {:?}", other),
        }
    }

    #[test]
    fn test_interpret_error_and_other_types() {
        let error = json!({"error": "HTTP 500"});
        assert_eq!(
            SearchResponse::interpret(&error),
            SearchResponse::Error("HTTP 500".to_string())
        );

        // error 字段优先于 type
        let both = json!({"type": "SEARCH_RESULTS", "error": "boom", "results": []});
        assert!(matches!(SearchResponse::interpret(&both), SearchResponse::Error(_)));

        let other = json!({"type": "IMAGE_NOT_DECODED"});
        assert_eq!(
            SearchResponse::interpret(&other),
            SearchResponse::Other("IMAGE_NOT_DECODED".to_string())
        );
    }

    #[test]
    fn test_exclude_self_matches_is_exact() {
        let matches = vec![
            MatchRecord { matched_id: "7".into(), score: 0.5, tag: None },
            MatchRecord { matched_id: "42".into(), score: 0.9, tag: None },
            MatchRecord { matched_id: "07".into(), score: 0.1, tag: None },
        ];

        let (kept, excluded) = exclude_self_matches("7", matches);
        assert_eq!(excluded, 1);
        let ids: Vec<&str> = kept.iter().map(|m| m.matched_id.as_str()).collect();
        assert_eq!(ids, vec!["42", "07"]);
    }

    #[test]
    fn test_outcome_kind_labels() {
        assert_eq!(OutcomeKind::ResourceMissing.to_string(), "RESOURCE_MISSING");
        assert!(OutcomeKind::Success.is_success());
        assert!(!OutcomeKind::RemoteError.is_success());
    }
}
