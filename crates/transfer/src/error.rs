//! # 転送エラー型
//!
//! 実行器の内部でのみ `Result` として流れ、公開APIでは
//! [`TransferError::into_outcome`] で `TransferOutcome` に変換される。

use std::path::PathBuf;
use std::time::Duration;

use s3presign_types::{FailureKind, TransferOutcome};

/// 転送エラー型。
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// ローカルファイルが存在しない・読めない
    #[error("ファイルが見つかりません: file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },
    /// リクエストがタイムアウトした
    #[error("タイムアウト (timeout): {:?} 以内に転送が完了しませんでした", .after)]
    Timeout { after: Duration },
    /// ストアが成功以外のステータスを返した
    #[error("HTTP {status} で拒否されました{}", format_detail(.detail))]
    Rejected { status: u16, detail: Option<String> },
    /// 接続失敗などの通信エラー
    #[error("通信エラー (transport): {0}")]
    Transport(String),
    /// 保存先の作成・書き込み失敗
    #[error("ローカルI/Oエラー: {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Content-Typeとして解釈できない
    #[error("Content-Typeが不正です: {content_type}: {reason}")]
    InvalidContentType { content_type: String, reason: String },
}

fn format_detail(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl TransferError {
    /// reqwestのエラーを分類する。URL（署名を含む）はメッセージから除く。
    pub(crate) fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            TransferError::Timeout { after: timeout }
        } else {
            TransferError::Transport(e.without_url().to_string())
        }
    }

    /// ストリーム読み込み中のI/Oエラーを分類する。
    pub(crate) fn from_stream_io(e: std::io::Error, timeout: Duration) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            TransferError::Timeout { after: timeout }
        } else {
            TransferError::Transport(e.to_string())
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            TransferError::FileNotFound { .. } => FailureKind::FileNotFound,
            TransferError::Timeout { .. } => FailureKind::Timeout,
            TransferError::Rejected { status, .. } => FailureKind::HttpStatus(*status),
            TransferError::Transport(_) => FailureKind::Transport,
            TransferError::LocalIo { .. } => FailureKind::LocalIo,
            TransferError::InvalidContentType { .. } => FailureKind::InvalidRequest,
        }
    }

    pub fn into_outcome(self) -> TransferOutcome {
        TransferOutcome::failed(self.kind(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_message_names_path() {
        let outcome = TransferError::FileNotFound {
            path: PathBuf::from("/data/missing.bin"),
        }
        .into_outcome();
        assert!(!outcome.success);
        assert!(
            outcome.message.contains("file not found: /data/missing.bin"),
            "{}",
            outcome.message
        );
        assert_eq!(outcome.failure, Some(FailureKind::FileNotFound));
    }

    #[test]
    fn test_rejected_message_contains_status_and_detail() {
        let outcome = TransferError::Rejected {
            status: 403,
            detail: Some("AccessDenied: Access Denied".to_string()),
        }
        .into_outcome();
        assert!(!outcome.success);
        assert!(outcome.message.contains("403"));
        assert!(outcome.message.contains("AccessDenied"));
        assert_eq!(outcome.failure, Some(FailureKind::HttpStatus(403)));

        let bare = TransferError::Rejected {
            status: 500,
            detail: None,
        };
        assert_eq!(bare.to_string(), "HTTP 500 で拒否されました");
    }

    #[test]
    fn test_timeout_is_distinct_from_status() {
        let outcome = TransferError::Timeout {
            after: Duration::from_secs(30),
        }
        .into_outcome();
        assert!(outcome.message.contains("timeout"));
        assert!(!outcome.message.contains("HTTP"));
        assert_eq!(outcome.failure, Some(FailureKind::Timeout));
    }

    #[test]
    fn test_stream_io_classification() {
        let timeout = Duration::from_secs(1);
        let e = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert!(matches!(
            TransferError::from_stream_io(e, timeout),
            TransferError::Timeout { .. }
        ));
        let e = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(
            TransferError::from_stream_io(e, timeout),
            TransferError::Transport(_)
        ));
    }
}
