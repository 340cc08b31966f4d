//! # S3互換ストア用の署名器
//!
//! AWS S3, Yandex Object Storage, MinIO 等のS3互換APIを対象とする。
//! GETの署名付きURLと一覧による接続確認は rust-s3 に任せ、
//! POSTポリシーの署名は [`crate::post_policy`] で行う。

use chrono::Utc;
use s3presign_types::{
    Condition, LogLevel, ObjectLocator, SignedDownloadRequest, SignedUploadRequest, UploadPolicy,
};

use crate::post_policy::{sign_post_policy, PostPolicyInput};
use crate::{
    validate_expiry, validate_policy, Signer, SigningError, SigningErrorCode, StoreCredentials,
    StoreProbe,
};

/// S3互換署名器の設定。
#[derive(Debug, Clone)]
pub struct S3SignerConfig {
    /// ストアのエンドポイントURL
    pub endpoint: String,
    /// リージョン名
    pub region: String,
    /// 認証情報
    pub credentials: StoreCredentials,
    /// ログ詳細度
    pub log_level: LogLevel,
}

/// S3互換ストアの署名器。
pub struct S3Signer {
    config: S3SignerConfig,
    region: s3::Region,
    s3_credentials: s3::creds::Credentials,
}

impl S3Signer {
    /// 設定から署名器を構築する。ネットワークには触れない。
    pub fn new(config: S3SignerConfig) -> Result<Self, SigningError> {
        let parsed = url::Url::parse(&config.endpoint).map_err(|e| {
            SigningError::new(
                SigningErrorCode::InvalidEndpoint,
                format!("エンドポイントURLが不正です: {}: {e}", config.endpoint),
            )
        })?;
        if parsed.host_str().is_none() {
            return Err(SigningError::new(
                SigningErrorCode::InvalidEndpoint,
                format!("エンドポイントにホストがありません: {}", config.endpoint),
            ));
        }

        let region = s3::Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        };

        let s3_credentials = s3::creds::Credentials::new(
            Some(config.credentials.access_key.as_str()),
            Some(config.credentials.secret_key.as_str()),
            config.credentials.session_token.as_deref(),
            None,
            None,
        )
        .map_err(|e| {
            SigningError::new(
                SigningErrorCode::Credentials,
                format!("認証情報を構築できません: {e}"),
            )
        })?;

        tracing::debug!(
            endpoint = %config.endpoint,
            region = %config.region,
            "S3署名器を初期化"
        );

        Ok(Self {
            config,
            region,
            s3_credentials,
        })
    }

    /// 呼び出しごとにパス形式のバケットハンドルを作る。
    fn bucket(&self, name: &str) -> Result<s3::Bucket, SigningError> {
        let bucket = s3::Bucket::new(name, self.region.clone(), self.s3_credentials.clone())
            .map_err(|e| {
                SigningError::new(
                    SigningErrorCode::Provider,
                    format!("バケットハンドルを作成できません: {e}"),
                )
            })?
            .with_path_style();
        Ok(*bucket)
    }
}

#[async_trait::async_trait]
impl Signer for S3Signer {
    async fn sign_upload(
        &self,
        locator: &ObjectLocator,
        policy: &UploadPolicy,
        expires_in_secs: u32,
    ) -> Result<SignedUploadRequest, SigningError> {
        validate_expiry(expires_in_secs)?;
        validate_policy(locator, policy)?;

        if self.config.log_level.is_verbose() {
            for condition in &policy.conditions {
                match condition {
                    Condition::SizeRange { min, max } => {
                        tracing::debug!(min, max, "ポリシー条件: content-length-range");
                    }
                    Condition::ExactMatch { field, value } => {
                        tracing::debug!(field = %field, value = %value, "ポリシー条件: 完全一致");
                    }
                }
            }
        }

        let signed = sign_post_policy(PostPolicyInput {
            credentials: &self.config.credentials,
            region: &self.config.region,
            endpoint: &self.config.endpoint,
            locator,
            policy,
            expires_in_secs,
            now: Utc::now(),
        })?;

        if self.config.log_level.is_verbose() {
            for (name, value) in signed.policy_fields.iter() {
                tracing::debug!(field = %name, value = %value, "フォームフィールド");
            }
        }
        tracing::info!(
            bucket = %locator.bucket(),
            key = %locator.key(),
            expires_in_secs,
            "署名付きPOSTを生成"
        );

        Ok(signed)
    }

    async fn sign_download(
        &self,
        locator: &ObjectLocator,
        expires_in_secs: u32,
    ) -> Result<SignedDownloadRequest, SigningError> {
        validate_expiry(expires_in_secs)?;

        let url = self
            .bucket(locator.bucket())?
            .presign_get(locator.key(), expires_in_secs, None)
            .await
            .map_err(|e| {
                SigningError::new(
                    SigningErrorCode::Provider,
                    format!("署名付きダウンロードURL生成失敗: {e}"),
                )
            })?;

        tracing::info!(
            bucket = %locator.bucket(),
            key = %locator.key(),
            expires_in_secs,
            "署名付きGETを生成"
        );

        Ok(SignedDownloadRequest {
            url,
            expires_in_secs,
            locator: locator.clone(),
        })
    }
}

#[async_trait::async_trait]
impl StoreProbe for S3Signer {
    async fn list_probe(&self, bucket: &str) -> Result<usize, SigningError> {
        let (result, _status) = self
            .bucket(bucket)?
            .list_page(String::new(), None, None, None, Some(1))
            .await
            .map_err(|e| {
                SigningError::new(SigningErrorCode::Provider, format!("一覧取得に失敗: {e}"))
            })?;
        Ok(result.contents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3presign_core::build_policy;
    use std::num::NonZeroU32;

    fn config(endpoint: &str) -> S3SignerConfig {
        S3SignerConfig {
            endpoint: endpoint.to_string(),
            region: "ru-central1".to_string(),
            credentials: StoreCredentials::new("AKID", "secret"),
            log_level: LogLevel::Debug,
        }
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let err = S3Signer::new(config("storage without scheme")).err().unwrap();
        assert_eq!(err.code, SigningErrorCode::InvalidEndpoint);
    }

    #[tokio::test]
    async fn test_sign_download_builds_presigned_url() {
        let signer = S3Signer::new(config("http://127.0.0.1:9000/")).unwrap();
        let locator = ObjectLocator::new("bucket", "dir/file.txt").unwrap();

        let signed = signer.sign_download(&locator, 600).await.unwrap();
        assert!(
            signed.url.starts_with("http://127.0.0.1:9000/bucket/dir/file.txt?"),
            "パス形式のURLが期待される: {}",
            signed.url
        );
        assert!(signed.url.contains("X-Amz-Signature="), "{}", signed.url);
        assert!(signed.url.contains("X-Amz-Expires=600"), "{}", signed.url);
        assert_eq!(signed.locator, locator);
    }

    #[tokio::test]
    async fn test_sign_rejects_bad_expiry_before_provider() {
        let signer = S3Signer::new(config("http://127.0.0.1:9000")).unwrap();
        let locator = ObjectLocator::new("bucket", "k").unwrap();

        let err = signer.sign_download(&locator, 0).await.unwrap_err();
        assert_eq!(err.code, SigningErrorCode::InvalidExpiry);

        let policy = build_policy(&locator, NonZeroU32::new(1).unwrap(), None, None);
        let err = signer
            .sign_upload(&locator, &policy, crate::MAX_EXPIRY_SECS + 1)
            .await
            .unwrap_err();
        assert_eq!(err.code, SigningErrorCode::InvalidExpiry);
    }

    #[tokio::test]
    async fn test_sign_upload_appends_signature_fields() {
        let signer = S3Signer::new(config("https://storage.yandexcloud.net/")).unwrap();
        let locator = ObjectLocator::new("bucket", "uploads/a.txt").unwrap();
        let policy = build_policy(&locator, NonZeroU32::new(10).unwrap(), Some("text/plain"), None);

        let signed = signer.sign_upload(&locator, &policy, 3600).await.unwrap();
        assert_eq!(signed.url, "https://storage.yandexcloud.net/bucket");
        assert_eq!(signed.policy_fields.get("key"), Some("uploads/a.txt"));
        assert_eq!(signed.policy_fields.get("Content-Type"), Some("text/plain"));
        assert!(signed.policy_fields.contains_key("policy"));
        assert!(signed.policy_fields.contains_key("x-amz-signature"));
        assert_eq!(signed.expires_in_secs, 3600);
    }
}
