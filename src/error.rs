use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("入力ファイルが見つかりません: {0}")]
    InputNotFound(String),

    #[error("入力ファイルの読み込みに失敗: {0}")]
    InputParse(String),

    #[error("医薬品名が1件もありません: {0}")]
    EmptyInput(String),

    #[error("チェックポイントが不正です: {0}")]
    CheckpointIntegrity(String),

    #[error("チェックポイントが別の入力リストのものです（--fresh で作り直してください）: {0}")]
    CheckpointMismatch(String),

    #[error("チェックポイント書き込みエラー: {0}")]
    CheckpointWrite(#[source] std::io::Error),

    #[error("実行状態が不正です: {0}")]
    InvalidState(String),

    #[error("出力エラー: {0}")]
    Export(String),

    #[error("HTTPクライアント初期化エラー: {0}")]
    Http(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSVエラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel読み込みエラー: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("設定読み込みエラー: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error(transparent)]
    Common(#[from] medprice_common::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
