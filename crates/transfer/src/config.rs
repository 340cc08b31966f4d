//! # 転送設定

use std::path::PathBuf;
use std::time::Duration;

use s3presign_types::LogLevel;

/// リクエスト全体のタイムアウト（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// ストリーミング時のチャンクサイズ（8 KiB）
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// アップロード・ダウンロード実行器の設定。
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// 1リクエストあたりのタイムアウト
    pub timeout: Duration,
    /// 読み書きのチャンクサイズ（バイト）
    pub chunk_size: usize,
    /// 出力パス未指定時のダウンロード先ディレクトリ
    pub download_dir: PathBuf,
    /// ログ詳細度
    pub log_level: LogLevel,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            download_dir: PathBuf::from("."),
            log_level: LogLevel::default(),
        }
    }
}

impl TransferConfig {
    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// 0は1として扱う
    pub(crate) fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}
