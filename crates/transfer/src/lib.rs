//! # s3presign Transfer
//!
//! 署名済みリクエストを使ってアップロード・ダウンロードを実行する。
//!
//! ## 方針
//! - 1回の呼び出しにつき1リクエスト、固定タイムアウト、リトライなし
//! - あらゆる失敗は `TransferOutcome` に変換して返す（呼び出し元へエラーを投げない）
//! - タイムアウトはHTTPステータスによる拒否と区別できるメッセージにする

pub mod config;
pub mod download;
pub mod error;
pub mod upload;

#[cfg(test)]
mod test_helpers;

pub use config::TransferConfig;
pub use download::DownloadExecutor;
pub use error::TransferError;
pub use upload::UploadExecutor;

/// 設定から転送用HTTPクライアントを構築する。
fn build_client(config: &TransferConfig) -> Result<reqwest::Client, TransferError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| TransferError::Transport(format!("HTTPクライアントを構築できません: {e}")))
}
