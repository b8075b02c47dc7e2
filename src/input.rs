//! 入力リストの読み込み
//!
//! - `.txt`: 1行1件
//! - `.csv` / `.xlsx` / `.xls`: 1行目は見出し。`medicine_name`（または `raw_name`, `name`）列、
//!   見つからなければ先頭列を使う
//!
//! 名前は小文字化・空白正規化し、空欄は飛ばす。

use crate::error::{ResolveError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::warn;

const NAME_COLUMNS: &[&str] = &["medicine_name", "raw_name", "name"];

/// 名前リストを読み込む
pub fn read_names(path: &Path) -> Result<Vec<String>> {
    read_names_with_column(path, None)
}

/// 列名を指定して読み込む（`.txt` では無視）
pub fn read_names_with_column(path: &Path, column: Option<&str>) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(ResolveError::InputNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let raw = match extension.as_str() {
        "txt" | "" => read_lines(path)?,
        "csv" => read_csv_column(path, column)?,
        "xlsx" | "xlsm" | "xls" => read_sheet_column(path, column)?,
        other => {
            return Err(ResolveError::InputParse(format!(
                "未対応の拡張子です: .{} ({})",
                other,
                path.display()
            )))
        }
    };

    let mut names = Vec::with_capacity(raw.len());
    for (line, value) in raw.into_iter().enumerate() {
        let name = normalize_name(&value);
        if name.is_empty() {
            warn!(path = %path.display(), line = line + 1, "空欄をスキップ");
            continue;
        }
        names.push(name);
    }

    if names.is_empty() {
        return Err(ResolveError::EmptyInput(path.display().to_string()));
    }
    Ok(names)
}

/// 小文字化・前後空白除去・連続空白の圧縮
pub fn normalize_name(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let content = content.trim_start_matches('\u{feff}');
    Ok(content.lines().map(|l| l.to_string()).collect())
}

/// 見出し行から名前列の位置を決める
fn pick_column(headers: &[String], column: Option<&str>) -> Result<usize> {
    let find = |wanted: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    };

    if let Some(wanted) = column {
        return find(wanted).ok_or_else(|| {
            ResolveError::InputParse(format!("列が見つかりません: {} (見出し: {:?})", wanted, headers))
        });
    }

    Ok(NAME_COLUMNS.iter().find_map(|c| find(c)).unwrap_or(0))
}

fn read_csv_column(path: &Path, column: Option<&str>) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let col = pick_column(&headers, column)?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        values.push(record.get(col).unwrap_or("").to_string());
    }
    Ok(values)
}

fn read_sheet_column(path: &Path, column: Option<&str>) -> Result<Vec<String>> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ResolveError::InputParse(format!("シートがありません: {}", path.display())))?;
    let range = workbook.worksheet_range(&sheet)?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(cell_text).collect();
    let col = pick_column(&headers, column)?;

    Ok(rows
        .map(|row| row.get(col).map(cell_text).unwrap_or_default())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
