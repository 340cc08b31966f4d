//! # s3presign Signer
//!
//! 署名付きPOSTポリシーと署名付きGET URLを発行する署名器の抽象インターフェース。
//! S3互換ストレージ実装は `s3_signer` サブモジュールを参照。
//!
//! ## 責務
//! - 署名前に有効期限とポリシーの形を検証する（不正ならプロバイダを呼ばない）
//! - 署名の失敗は `SigningError` として呼び出し元に返す（自動リトライはしない）

pub mod credentials;
pub mod post_policy;
pub mod probe;
#[cfg(feature = "vendor-s3")]
pub mod s3_signer;

pub use credentials::{CredentialsError, StoreCredentials};
pub use probe::{check_connectivity, check_connectivity_within, StoreProbe, PROBE_TIMEOUT};
#[cfg(feature = "vendor-s3")]
pub use s3_signer::{S3Signer, S3SignerConfig};

use s3presign_core::check_policy;
use s3presign_types::{ObjectLocator, SignedDownloadRequest, SignedUploadRequest, UploadPolicy};

/// SigV4署名の有効期限上限（7日）
pub const MAX_EXPIRY_SECS: u32 = 7 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// エラー型
// ---------------------------------------------------------------------------

/// 署名失敗の分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningErrorCode {
    /// 有効期限が範囲外
    InvalidExpiry,
    /// ポリシーの形が不正
    MalformedPolicy,
    /// 認証情報がない・不正
    Credentials,
    /// エンドポイントURLが不正
    InvalidEndpoint,
    /// プロバイダ（SDK・ストア）側のエラー
    Provider,
}

impl SigningErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningErrorCode::InvalidExpiry => "InvalidExpiry",
            SigningErrorCode::MalformedPolicy => "MalformedPolicy",
            SigningErrorCode::Credentials => "Credentials",
            SigningErrorCode::InvalidEndpoint => "InvalidEndpoint",
            SigningErrorCode::Provider => "Provider",
        }
    }
}

/// 署名器のエラー型。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("署名に失敗しました [{}]: {message}", .code.as_str())]
pub struct SigningError {
    pub code: SigningErrorCode,
    pub message: String,
}

impl SigningError {
    pub fn new(code: SigningErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Signer トレイト
// ---------------------------------------------------------------------------

/// 署名器の抽象インターフェース。
///
/// 実装はS3互換ストレージ（AWS S3, Yandex Object Storage, MinIO等）ごとに
/// 選択できる。返されたリクエストは一度だけ使われ、再利用されない。
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
    /// POSTアップロード用の署名付きURLとフォームフィールドを生成する。
    async fn sign_upload(
        &self,
        locator: &ObjectLocator,
        policy: &UploadPolicy,
        expires_in_secs: u32,
    ) -> Result<SignedUploadRequest, SigningError>;

    /// GETダウンロード用の署名付きURLを生成する。
    async fn sign_download(
        &self,
        locator: &ObjectLocator,
        expires_in_secs: u32,
    ) -> Result<SignedDownloadRequest, SigningError>;
}

/// 有効期限が `1..=MAX_EXPIRY_SECS` に収まっているか検証する。
pub fn validate_expiry(expires_in_secs: u32) -> Result<(), SigningError> {
    if (1..=MAX_EXPIRY_SECS).contains(&expires_in_secs) {
        Ok(())
    } else {
        Err(SigningError::new(
            SigningErrorCode::InvalidExpiry,
            format!("有効期限は1〜{MAX_EXPIRY_SECS}秒である必要があります: {expires_in_secs}"),
        ))
    }
}

/// 署名前のポリシー検証。
///
/// フォームフィールドと条件の対称性、禁止フィールド、サイズ条件を確かめ、
/// さらにポリシーのkey/bucketがロケータと一致することを確かめる。
pub fn validate_policy(locator: &ObjectLocator, policy: &UploadPolicy) -> Result<(), SigningError> {
    check_policy(policy)
        .map_err(|e| SigningError::new(SigningErrorCode::MalformedPolicy, e.to_string()))?;

    for (field, expected) in [("key", locator.key()), ("bucket", locator.bucket())] {
        if policy.fields.get(field) != Some(expected) {
            return Err(SigningError::new(
                SigningErrorCode::MalformedPolicy,
                format!("ポリシーの {field} がロケータ {locator} と一致しません"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3presign_core::build_policy;
    use std::num::NonZeroU32;

    #[test]
    fn test_validate_expiry_bounds() {
        assert!(validate_expiry(1).is_ok());
        assert!(validate_expiry(3600).is_ok());
        assert!(validate_expiry(MAX_EXPIRY_SECS).is_ok());

        let err = validate_expiry(0).unwrap_err();
        assert_eq!(err.code, SigningErrorCode::InvalidExpiry);
        let err = validate_expiry(MAX_EXPIRY_SECS + 1).unwrap_err();
        assert_eq!(err.code, SigningErrorCode::InvalidExpiry);
    }

    #[test]
    fn test_validate_policy_checks_locator() {
        let locator = ObjectLocator::new("b", "k").unwrap();
        let policy = build_policy(&locator, NonZeroU32::new(1).unwrap(), None, None);
        assert!(validate_policy(&locator, &policy).is_ok());

        let other = ObjectLocator::new("b", "other").unwrap();
        let err = validate_policy(&other, &policy).unwrap_err();
        assert_eq!(err.code, SigningErrorCode::MalformedPolicy);
    }

    #[test]
    fn test_validate_policy_rejects_asymmetric() {
        let locator = ObjectLocator::new("b", "k").unwrap();
        let mut policy = build_policy(&locator, NonZeroU32::new(1).unwrap(), None, None);
        policy.fields.insert("success_action_status", "201");

        let err = validate_policy(&locator, &policy).unwrap_err();
        assert_eq!(err.code, SigningErrorCode::MalformedPolicy);
        assert!(err.to_string().contains("MalformedPolicy"), "{err}");
    }
}
