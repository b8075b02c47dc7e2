//! 出力用の表生成（CLIから利用）

#[cfg(feature = "excel")]
pub mod excel_core;
