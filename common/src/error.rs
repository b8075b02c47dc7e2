//! エラー型定義

use thiserror::Error;

/// 共通エラー型
///
/// 候補単位のパース失敗は `parser::CandidateParseError` で扱い、ここには含めない。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
