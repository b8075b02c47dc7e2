//! チェックポイント
//!
//! 処理済みの結果行をJSONファイルに保存し、中断後に続きから再開できるようにする。
//! 書き込みは同じディレクトリの一時ファイルに書いてから rename する
//! （途中で落ちても、書き込み前か後のどちらかの状態が残る）。
//! unix では rename 後にディレクトリも sync し、電源断でも rename を失わない。
//!
//! 1つのチェックポイントファイルを同時に使えるのは1プロセスだけ。

use crate::error::{ResolveError, Result};
use medprice_common::{ResultRow, TierSummary};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// チェックポイントの内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// バージョン（互換性チェック用）
    pub version: u32,
    /// 入力リストのSHA-256
    pub input_fingerprint: String,
    /// 入力件数
    pub total: usize,
    pub completed_count: usize,
    /// 最後に確定した行のindex
    pub last_index: Option<usize>,
    pub updated_at: String,
    pub rows: Vec<ResultRow>,
}

impl CheckpointState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(input_fingerprint: impl Into<String>, total: usize) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            input_fingerprint: input_fingerprint.into(),
            total,
            completed_count: 0,
            last_index: None,
            updated_at: chrono::Local::now().to_rfc3339(),
            rows: Vec::new(),
        }
    }

    pub fn summary(&self) -> TierSummary {
        TierSummary::from_rows(&self.rows)
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count >= self.total
    }

    /// 件数とindexの連続性を検証（修復はしない）
    pub fn validate(&self) -> Result<()> {
        if self.version != Self::CURRENT_VERSION {
            return Err(ResolveError::CheckpointIntegrity(format!(
                "未対応のバージョンです: {}",
                self.version
            )));
        }
        if self.completed_count != self.rows.len() {
            return Err(ResolveError::CheckpointIntegrity(format!(
                "completed_count ({}) と行数 ({}) が一致しません",
                self.completed_count,
                self.rows.len()
            )));
        }
        if let Some((position, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(position, row)| row.index != *position)
        {
            return Err(ResolveError::CheckpointIntegrity(format!(
                "{}行目のindexが {} です（連番ではありません）",
                position, row.index
            )));
        }
        if self.rows.len() > self.total {
            return Err(ResolveError::CheckpointIntegrity(format!(
                "行数 ({}) が入力件数 ({}) を超えています",
                self.rows.len(),
                self.total
            )));
        }
        if self.last_index != self.rows.last().map(|r| r.index) {
            return Err(ResolveError::CheckpointIntegrity(format!(
                "last_index ({:?}) が最終行と一致しません",
                self.last_index
            )));
        }
        Ok(())
    }
}

/// 入力リストのフィンガープリント（SHA-256, hex）
pub fn fingerprint(names: &[String]) -> String {
    let mut hasher = Sha256::new();
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// チェックポイントファイル
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// 読み込み（ファイルがなければ None）
    pub fn load(&self) -> Result<Option<CheckpointState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let state: CheckpointState = serde_json::from_reader(reader).map_err(|e| {
            ResolveError::CheckpointIntegrity(format!("{}: {}", self.path.display(), e))
        })?;

        state.validate()?;
        Ok(Some(state))
    }

    /// 入力リストに対応するチェックポイントを読み込む
    pub fn load_for(&self, input_fingerprint: &str, total: usize) -> Result<Option<CheckpointState>> {
        let Some(state) = self.load()? else {
            return Ok(None);
        };

        if state.input_fingerprint != input_fingerprint || state.total != total {
            return Err(ResolveError::CheckpointMismatch(format!(
                "{} (保存時 {}件, 今回 {}件)",
                self.path.display(),
                state.total,
                total
            )));
        }
        Ok(Some(state))
    }

    /// 行を追加して書き出す
    ///
    /// 書き込みに成功したときだけ `state` を更新する。
    /// indexが続き番号でない行は書き込まずに拒否する。
    pub fn append_and_flush(&self, state: &mut CheckpointState, rows: Vec<ResultRow>) -> io::Result<()> {
        let mut expected = state.rows.len();
        for row in &rows {
            if row.index != expected {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("index {} の行を追加できません（期待値 {}）", row.index, expected),
                ));
            }
            expected += 1;
        }

        let mut next = state.clone();
        next.rows.extend(rows);
        next.completed_count = next.rows.len();
        next.last_index = next.rows.last().map(|r| r.index);
        next.updated_at = chrono::Local::now().to_rfc3339();

        self.write_atomic(&next)?;
        *state = next;
        Ok(())
    }

    fn write_atomic(&self, state: &CheckpointState) -> io::Result<()> {
        let temp_path = self.temp_path();
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, state)?;
            writer.flush()?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        std::fs::rename(&temp_path, &self.path)?;
        sync_parent_dir(&self.path)
    }

    /// 削除（一時ファイルも消す）。消したファイルがあれば true
    pub fn clear(&self) -> io::Result<bool> {
        let mut removed = false;
        for path in [self.path.clone(), self.temp_path()] {
            if path.exists() {
                std::fs::remove_file(&path)?;
                removed = true;
            }
        }
        Ok(removed)
    }
}

/// ファイルを含むディレクトリのエントリをディスクに確定させる
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
