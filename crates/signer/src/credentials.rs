//! # ストア認証情報
//!
//! 明示指定（CLIフラグ）を優先し、なければ環境変数から読み込む。

use std::fmt;

/// アクセスキーの環境変数名
pub const ENV_ACCESS_KEY: &str = "AWS_ACCESS_KEY_ID";
/// シークレットキーの環境変数名
pub const ENV_SECRET_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// セッショントークンの環境変数名（任意）
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// 認証情報の解決エラー。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsError {
    #[error("アクセスキーがありません: --access-key または環境変数 {} を指定してください", ENV_ACCESS_KEY)]
    MissingAccessKey,
    #[error("シークレットキーがありません: --secret-key または環境変数 {} を指定してください", ENV_SECRET_KEY)]
    MissingSecretKey,
}

/// S3互換ストアの認証情報。
#[derive(Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

// シークレットをログに出さない
impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl StoreCredentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// 明示指定と環境変数から認証情報を解決する。
    pub fn resolve(
        access_key: Option<&str>,
        secret_key: Option<&str>,
    ) -> Result<Self, CredentialsError> {
        Self::resolve_with(access_key, secret_key, |name| std::env::var(name).ok())
    }

    /// 環境変数の参照先を差し替えて解決する。
    pub fn resolve_with(
        access_key: Option<&str>,
        secret_key: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CredentialsError> {
        let pick = |flag: Option<&str>, var: &str| {
            flag.map(str::to_string)
                .or_else(|| env(var))
                .filter(|v| !v.trim().is_empty())
        };

        let access_key =
            pick(access_key, ENV_ACCESS_KEY).ok_or(CredentialsError::MissingAccessKey)?;
        let secret_key =
            pick(secret_key, ENV_SECRET_KEY).ok_or(CredentialsError::MissingSecretKey)?;
        let session_token = env(ENV_SESSION_TOKEN).filter(|v| !v.trim().is_empty());

        Ok(Self {
            access_key,
            secret_key,
            session_token,
        })
    }
}
