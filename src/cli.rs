use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medprice")]
#[command(about = "医薬品名リストから販売サイトのMRPを照合・取得するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（省略時: ~/.config/medprice/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 名前リストを一括照合して結果表を出力（チェックポイントから再開）
    Run {
        /// 入力ファイル (.txt/.csv/.xlsx)
        #[arg(required = true)]
        input: PathBuf,

        /// 出力ファイル（デフォルト: medprice-results）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (csv/excel/both)
        #[arg(short, long, default_value = "both")]
        format: ExportFormat,

        /// 名前の列（csv/xlsx）
        #[arg(long)]
        column: Option<String>,

        /// チェックポイントファイル
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// リクエスト間隔（秒）
        #[arg(long)]
        delay: Option<f64>,

        /// チェックポイントを消して最初から実行
        #[arg(long)]
        fresh: bool,
    },

    /// 1件だけ照合して表示（チェックポイントなし）
    Lookup {
        /// 医薬品名
        #[arg(required = true)]
        name: String,
    },

    /// チェックポイントの結果を出力
    Export {
        /// チェックポイントファイル
        #[arg(required = true)]
        checkpoint: PathBuf,

        /// 出力ファイル
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (csv/excel/both)
        #[arg(short, long, default_value = "both")]
        format: ExportFormat,
    },

    /// チェックポイント管理
    Checkpoint {
        /// チェックポイントファイル（省略時は設定値）
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// 情報を表示
        #[arg(long)]
        info: bool,

        /// 削除
        #[arg(long)]
        clear: bool,

        /// 確認なしで削除
        #[arg(short, long)]
        yes: bool,
    },

    /// 設定を表示/初期化
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 既定値で設定ファイルを作成
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
    #[default]
    Both,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "both" => Ok(ExportFormat::Both),
            _ => Err(format!("Unknown format: {}. Use csv, excel, or both", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert_eq!("both".parse::<ExportFormat>().unwrap(), ExportFormat::Both);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "medprice", "run", "names.xlsx", "--format", "csv", "--delay", "3", "--fresh", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run { input, format, delay, fresh, .. } => {
                assert_eq!(input, PathBuf::from("names.xlsx"));
                assert_eq!(format, ExportFormat::Csv);
                assert_eq!(delay, Some(3.0));
                assert!(fresh);
            }
            _ => panic!("run ではありません"),
        }
    }
}
