pub mod csv;
pub mod excel;

use crate::cli::ExportFormat;
use crate::error::Result;
use medprice_common::ResultRow;
use std::path::{Path, PathBuf};

pub const DEFAULT_STEM: &str = "medprice-results";

fn output_path_for_format(output: &Path, extension: &str) -> PathBuf {
    if output.is_dir() {
        output.join(format!("{}.{}", DEFAULT_STEM, extension))
    } else if output.extension().is_none() {
        output.with_extension(extension)
    } else {
        output.to_path_buf()
    }
}

fn output_paths_for_both(output: &Path) -> (PathBuf, PathBuf) {
    if output.is_dir() {
        (
            output.join(format!("{}.csv", DEFAULT_STEM)),
            output.join(format!("{}.xlsx", DEFAULT_STEM)),
        )
    } else {
        (output.with_extension("csv"), output.with_extension("xlsx"))
    }
}

/// 結果表を書き出し、書いたファイルのパスを返す
pub fn export_rows(rows: &[ResultRow], format: &ExportFormat, output: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    match format {
        ExportFormat::Csv => {
            let path = output_path_for_format(output, "csv");
            self::csv::generate_csv(rows, &path)?;
            written.push(path);
        }
        ExportFormat::Excel => {
            let path = output_path_for_format(output, "xlsx");
            excel::generate_excel(rows, &path)?;
            written.push(path);
        }
        ExportFormat::Both => {
            let (csv_path, excel_path) = output_paths_for_both(output);
            self::csv::generate_csv(rows, &csv_path)?;
            excel::generate_excel(rows, &excel_path)?;
            written.push(csv_path);
            written.push(excel_path);
        }
    }

    Ok(written)
}
