//! Excel生成（共通ライブラリ）
//!
//! 結果表を `prices` シートに、区分ごとの件数を `summary` シートに書き出す。
//! 価格セルは区分の色で塗る（Exact=緑, Close=橙, Low=黄, NotFound=塗りなし）。

use crate::types::{ConfidenceTier, ResultRow, TierSummary};
use bigdecimal::ToPrimitive;
use rust_xlsxwriter::*;

/// 列定義（見出し, 列幅）
pub const COLUMNS: &[(&str, f64)] = &[
    ("index", 8.0),
    ("raw_name", 32.0),
    ("found_name", 40.0),
    ("price", 12.0),
    ("score", 8.0),
    ("tier", 12.0),
    ("product_url", 48.0),
    ("error", 36.0),
];

const PRICE_COL: u16 = 3;
const URL_COL: u16 = 6;
const ERROR_COL: u16 = 7;

fn tier_format(tier: ConfidenceTier) -> Format {
    let format = Format::new()
        .set_num_format("0.00")
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(0xCCCCCC));
    match tier.fill_color() {
        Some(rgb) => format.set_background_color(Color::RGB(rgb)),
        None => format,
    }
}

/// Excelをバッファに生成
///
/// # Arguments
/// * `rows` - 結果行（index順）
/// * `summary` - 区分ごとの件数
pub fn generate_price_workbook(rows: &[ResultRow], summary: &TierSummary) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::RGB(0xFFFFFF))
        .set_background_color(Color::RGB(0x1F4E79))
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);
    let score_format = Format::new().set_num_format("0.00");

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("prices")
            .map_err(|e| format!("シート名設定エラー: {}", e))?;

        for (col, (title, width)) in COLUMNS.iter().enumerate() {
            let col = col as u16;
            worksheet.write_string_with_format(0, col, *title, &header_format)
                .map_err(|e| format!("見出し書き込みエラー: {}", e))?;
            worksheet.set_column_width(col, *width)
                .map_err(|e| format!("列幅設定エラー: {}", e))?;
        }
        worksheet.set_freeze_panes(1, 0)
            .map_err(|e| format!("ウィンドウ枠固定エラー: {}", e))?;

        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            let price_format = tier_format(row.tier);

            worksheet.write_number(r, 0, row.index as f64)
                .map_err(|e| format!("書き込みエラー: {}", e))?;
            worksheet.write_string(r, 1, &row.raw_name)
                .map_err(|e| format!("書き込みエラー: {}", e))?;
            worksheet.write_string(r, 2, row.found_name.as_deref().unwrap_or(""))
                .map_err(|e| format!("書き込みエラー: {}", e))?;

            match row.price.as_ref().and_then(|p| p.to_f64()) {
                Some(price) => worksheet.write_number_with_format(r, PRICE_COL, price, &price_format),
                None => worksheet.write_blank(r, PRICE_COL, &price_format),
            }
            .map_err(|e| format!("価格書き込みエラー: {}", e))?;

            worksheet.write_number_with_format(r, 4, row.score, &score_format)
                .map_err(|e| format!("書き込みエラー: {}", e))?;
            worksheet.write_string(r, 5, row.tier.label())
                .map_err(|e| format!("書き込みエラー: {}", e))?;
            if let Some(url) = row.product_url.as_deref() {
                worksheet.write_url(r, URL_COL, url)
                    .map_err(|e| format!("URL書き込みエラー: {}", e))?;
            }
            worksheet.write_string(r, ERROR_COL, row.error.as_deref().unwrap_or(""))
                .map_err(|e| format!("書き込みエラー: {}", e))?;
        }
    }

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("summary")
            .map_err(|e| format!("シート名設定エラー: {}", e))?;
        worksheet.write_string_with_format(0, 0, "tier", &header_format)
            .map_err(|e| format!("見出し書き込みエラー: {}", e))?;
        worksheet.write_string_with_format(0, 1, "count", &header_format)
            .map_err(|e| format!("見出し書き込みエラー: {}", e))?;
        worksheet.set_column_width(0, 16.0)
            .map_err(|e| format!("列幅設定エラー: {}", e))?;

        for (i, tier) in ConfidenceTier::ALL.iter().enumerate() {
            let r = (i + 1) as u32;
            worksheet.write_string_with_format(r, 0, tier.label(), &tier_format(*tier))
                .map_err(|e| format!("書き込みエラー: {}", e))?;
            worksheet.write_number(r, 1, summary.count(*tier) as f64)
                .map_err(|e| format!("書き込みエラー: {}", e))?;
        }

        let total_row = (ConfidenceTier::ALL.len() + 1) as u32;
        worksheet.write_string_with_format(total_row, 0, "total", &header_format)
            .map_err(|e| format!("書き込みエラー: {}", e))?;
        worksheet.write_number(total_row, 1, summary.total() as f64)
            .map_err(|e| format!("書き込みエラー: {}", e))?;
    }

    workbook.save_to_buffer()
        .map_err(|e| format!("Excel保存エラー: {}", e))
}
