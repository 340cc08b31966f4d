//! # 接続確認
//!
//! 起動時にストアへ軽量な一覧リクエストを送り、到達性と権限を確かめる。
//! 署名・転送はこの権限を必要としないため、失敗しても警告を出すだけで続行する。

use std::time::Duration;

use s3presign_types::LogLevel;

use crate::SigningError;

/// 一覧系の軽量リクエストを発行できるストア。
#[async_trait::async_trait]
pub trait StoreProbe: Send + Sync {
    /// バケットを一覧し、見えたキーの数を返す。
    async fn list_probe(&self, bucket: &str) -> Result<usize, SigningError>;
}

/// 接続確認1回あたりの上限時間
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// ベストエフォートの接続確認。失敗は握りつぶして `false` を返す。
pub async fn check_connectivity(
    probe: &dyn StoreProbe,
    bucket: &str,
    log_level: LogLevel,
) -> bool {
    check_connectivity_within(probe, bucket, log_level, PROBE_TIMEOUT).await
}

/// 上限時間を指定して接続確認する。時間切れも失敗として扱う。
pub async fn check_connectivity_within(
    probe: &dyn StoreProbe,
    bucket: &str,
    log_level: LogLevel,
    limit: Duration,
) -> bool {
    let result = match tokio::time::timeout(limit, probe.list_probe(bucket)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                bucket = %bucket,
                ?limit,
                "ストアへの接続確認がタイムアウト（続行します）"
            );
            return false;
        }
    };
    match result {
        Ok(keys) => {
            tracing::info!(bucket = %bucket, keys, "ストアへの接続を確認");
            true
        }
        Err(e) => {
            tracing::warn!(bucket = %bucket, error = %e, "ストアへの接続確認に失敗（続行します）");
            if log_level.is_verbose() {
                tracing::debug!(error = ?e, "接続確認エラーの詳細");
            }
            false
        }
    }
}
