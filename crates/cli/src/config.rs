//! # CLI設定の組み立て
//!
//! パース済みの引数と環境変数から、各コンポーネントに渡す設定値を作る。
//! ネットワークに触れる前に、必須入力の欠落をここで検出する。

use std::num::NonZeroU32;
use std::path::PathBuf;

use s3presign_signer::{CredentialsError, S3SignerConfig, StoreCredentials};
use s3presign_transfer::TransferConfig;
use s3presign_types::{Acl, LocatorError, LogLevel, ObjectLocator};

use crate::{Action, Cli};

/// 設定エラー。いずれも通信前に検出され、終了コード1になる。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// uploadに --file がない
    #[error("upload には --file の指定が必要です")]
    MissingFile,
    /// 認証情報がない
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    /// バケット名・キーが不正
    #[error("対象オブジェクトの指定が不正です: {0}")]
    Locator(#[from] LocatorError),
}

/// 1回の実行に必要な設定一式。
#[derive(Debug)]
pub struct AppConfig {
    pub action: Action,
    pub locator: ObjectLocator,
    pub file: Option<PathBuf>,
    pub max_size_mb: NonZeroU32,
    pub content_type: Option<String>,
    pub acl: Acl,
    pub output: Option<PathBuf>,
    pub expiration_secs: u32,
    pub log_level: LogLevel,
    pub signer: S3SignerConfig,
    pub transfer: TransferConfig,
}

impl AppConfig {
    /// 引数とプロセスの環境変数から設定を作る。
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        Self::from_cli_with(cli, |name| std::env::var(name).ok())
    }

    /// 環境変数の参照先を差し替えて設定を作る。
    pub fn from_cli_with(
        cli: Cli,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let locator = ObjectLocator::new(cli.bucket, cli.key)?;
        if cli.action == Action::Upload && cli.file.is_none() {
            return Err(ConfigError::MissingFile);
        }

        let credentials = StoreCredentials::resolve_with(
            cli.access_key.as_deref(),
            cli.secret_key.as_deref(),
            env,
        )?;
        let log_level = LogLevel::from_verbose(cli.verbose);

        Ok(Self {
            action: cli.action,
            locator,
            file: cli.file,
            max_size_mb: cli.max_size,
            content_type: cli.content_type,
            acl: cli.acl.into(),
            output: cli.output,
            expiration_secs: cli.expiration,
            log_level,
            signer: S3SignerConfig {
                endpoint: cli.endpoint,
                region: cli.region,
                credentials,
                log_level,
            },
            transfer: TransferConfig::default().with_log_level(log_level),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn creds_env(name: &str) -> Option<String> {
        match name {
            "AWS_ACCESS_KEY_ID" => Some("env-ak".to_string()),
            "AWS_SECRET_ACCESS_KEY" => Some("env-sk".to_string()),
            _ => None,
        }
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("s3presign").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_generate_config_from_env_credentials() {
        let cli = parse(&["--action", "generate", "--bucket", "b", "--key", "k"]);
        let config = AppConfig::from_cli_with(cli, creds_env).unwrap();

        assert_eq!(config.locator.bucket(), "b");
        assert_eq!(config.locator.key(), "k");
        assert_eq!(config.acl, Acl::Private);
        assert_eq!(config.max_size_mb.get(), 10);
        assert_eq!(config.expiration_secs, 3600);
        assert_eq!(config.signer.credentials.access_key, "env-ak");
        assert_eq!(config.signer.region, "ru-central1");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_upload_requires_file() {
        let cli = parse(&["--action", "upload", "--bucket", "b", "--key", "k"]);
        let err = AppConfig::from_cli_with(cli, creds_env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile), "{err:?}");
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let cli = parse(&["--action", "download", "--bucket", "b", "--key", "k"]);
        let err = AppConfig::from_cli_with(cli, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Credentials(_)), "{err:?}");
        assert!(err.to_string().contains("AWS_ACCESS_KEY_ID"), "{err}");
    }

    #[test]
    fn test_empty_bucket_is_rejected() {
        let cli = parse(&["--action", "generate", "--bucket", "", "--key", "k"]);
        let err = AppConfig::from_cli_with(cli, creds_env).unwrap_err();
        assert!(matches!(err, ConfigError::Locator(LocatorError::EmptyBucket)));
    }

    /// --verbose のログレベルが各コンポーネントの設定に渡る
    #[test]
    fn test_verbose_flows_into_components() {
        let cli = parse(&[
            "--action",
            "upload",
            "--bucket",
            "b",
            "--key",
            "k",
            "--file",
            "a.txt",
            "--access-key",
            "flag-ak",
            "--secret-key",
            "flag-sk",
            "--verbose",
        ]);
        let config = AppConfig::from_cli_with(cli, |_| None).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.signer.log_level, LogLevel::Debug);
        assert_eq!(config.transfer.log_level, LogLevel::Debug);
        assert_eq!(config.signer.credentials.access_key, "flag-ak");
        assert_eq!(config.file, Some(PathBuf::from("a.txt")));
    }
}
