//! Excel生成（CLI版）
//!
//! 共通ライブラリの excel_core でバッファを作り、ファイルに書き出す

use crate::error::{ResolveError, Result};
use medprice_common::export::excel_core::generate_price_workbook;
use medprice_common::{ResultRow, TierSummary};
use std::path::Path;

pub fn generate_excel(rows: &[ResultRow], output_path: &Path) -> Result<()> {
    let summary = TierSummary::from_rows(rows);
    let buffer = generate_price_workbook(rows, &summary).map_err(ResolveError::Export)?;
    std::fs::write(output_path, buffer)?;
    Ok(())
}
