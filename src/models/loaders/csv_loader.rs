use crate::config::ColumnMapping;
use crate::error::LoadError;
use crate::models::work_item::SourceRecord;
use std::collections::BTreeMap;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 读取源 CSV，按行序返回记录
///
/// 文件开头的 BOM 会被去掉；文件夹列缺失时该字段为空字符串。
pub fn read_source_csv(path: &Path, columns: &ColumnMapping) -> Result<Vec<SourceRecord>, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;

    parse_source_csv(&bytes, columns)
}

/// 从内存中的 CSV 内容解析记录
pub fn parse_source_csv(bytes: &[u8], columns: &ColumnMapping) -> Result<Vec<SourceRecord>, LoadError> {
    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content);

    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let id_idx = position(columns.id.as_str()).ok_or_else(|| LoadError::MissingColumn {
        column: columns.id.clone(),
    })?;
    let filename_idx = position(columns.filename.as_str()).ok_or_else(|| LoadError::MissingColumn {
        column: columns.filename.clone(),
    })?;
    let folder_idx = position(columns.folder.as_str());

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        let field = |idx: usize, column: &str| {
            row.get(idx).map(str::to_string).ok_or_else(|| LoadError::MissingField {
                line,
                column: column.to_string(),
            })
        };

        let id = field(id_idx, columns.id.as_str())?;
        let filename = field(filename_idx, columns.filename.as_str())?;
        let folder = folder_idx
            .and_then(|idx| row.get(idx))
            .unwrap_or_default()
            .to_string();

        let extra: BTreeMap<String, String> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != id_idx && *idx != filename_idx && Some(*idx) != folder_idx)
            .filter_map(|(idx, name)| row.get(idx).map(|v| (name.to_string(), v.to_string())))
            .collect();

        records.push(SourceRecord {
            id,
            filename,
            folder,
            extra,
        });
    }

    Ok(records)
}
