//! # s3presign CLI
//!
//! S3互換ストレージ向けの署名付きURLツール。
//!
//! ## アクション
//! - `generate`: 署名付きPOSTのURL・フォームフィールド・HTMLフォーム・curl例を表示
//! - `upload`: 署名付きPOSTでローカルファイルをアップロード
//! - `download`: 署名付きGETでオブジェクトをダウンロード
//!
//! ## 終了コード
//! - 0: 成功
//! - 1: 設定エラー・署名失敗・転送失敗・引数エラー
//! - 130: ユーザーによる中断

mod config;
mod render;

use std::future::Future;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use s3presign_core::build_policy;
use s3presign_signer::{check_connectivity, S3Signer, Signer};
use s3presign_transfer::{DownloadExecutor, UploadExecutor};
use s3presign_types::{Acl, LogLevel, TransferOutcome};

use crate::config::{AppConfig, ConfigError};

/// Yandex Object Storage のエンドポイント
const DEFAULT_ENDPOINT: &str = "https://storage.yandexcloud.net/";
/// Yandex Object Storage のリージョン
const DEFAULT_REGION: &str = "ru-central1";

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

// ---------------------------------------------------------------------------
// 引数
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    Generate,
    Upload,
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AclArg {
    Private,
    PublicRead,
    AuthenticatedRead,
}

impl From<AclArg> for Acl {
    fn from(arg: AclArg) -> Self {
        match arg {
            AclArg::Private => Acl::Private,
            AclArg::PublicRead => Acl::PublicRead,
            AclArg::AuthenticatedRead => Acl::AuthenticatedRead,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "s3presign",
    version,
    about = "S3互換ストレージ向け署名付きURLの生成とアップロード・ダウンロード"
)]
pub struct Cli {
    /// 実行するアクション
    #[arg(long, value_enum)]
    pub action: Action,

    /// バケット名
    #[arg(long)]
    pub bucket: String,

    /// オブジェクトキー
    #[arg(long)]
    pub key: String,

    /// アップロードするファイル（upload時は必須）
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// 最大アップロードサイズ（MB）
    #[arg(long, default_value = "10")]
    pub max_size: NonZeroU32,

    /// Content-Type（省略時は拡張子から推定）
    #[arg(long)]
    pub content_type: Option<String>,

    /// オブジェクトのACL
    #[arg(long, value_enum, default_value_t = AclArg::Private)]
    pub acl: AclArg,

    /// ダウンロード先のパス（download時のみ）
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// ストアのエンドポイントURL
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// リージョン
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// 署名の有効期限（秒）
    #[arg(long, default_value_t = 3600)]
    pub expiration: u32,

    /// アクセスキー（省略時は AWS_ACCESS_KEY_ID）
    #[arg(long)]
    pub access_key: Option<String>,

    /// シークレットキー（省略時は AWS_SECRET_ACCESS_KEY）
    #[arg(long)]
    pub secret_key: Option<String>,

    /// 詳細ログを出力する
    #[arg(short, long)]
    pub verbose: bool,
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return ExitCode::from(parse_error_exit(e)),
    };

    let log_level = LogLevel::from_verbose(cli.verbose);
    init_logging(log_level);

    ExitCode::from(run_until_interrupted(run(cli), tokio::signal::ctrl_c(), log_level).await)
}

/// アクションと中断シグナルを競わせ、プロセスの終了コードを決める。
async fn run_until_interrupted<I>(
    action: impl Future<Output = anyhow::Result<bool>>,
    interrupt: impl Future<Output = I>,
    log_level: LogLevel,
) -> u8 {
    tokio::select! {
        result = action => match result {
            Ok(true) => EXIT_SUCCESS,
            Ok(false) => EXIT_FAILURE,
            Err(e) => {
                if log_level.is_verbose() {
                    eprintln!("エラー: {e:?}");
                } else {
                    eprintln!("エラー: {e}");
                }
                EXIT_FAILURE
            }
        },
        _ = interrupt => {
            eprintln!();
            eprintln!("中断されました");
            EXIT_INTERRUPTED
        }
    }
}

/// ヘルプ・バージョン表示は0、それ以外の引数エラーは1で終了する。
fn parse_error_exit(e: clap::Error) -> u8 {
    let _ = e.print();
    match e.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
            EXIT_SUCCESS
        }
        _ => EXIT_FAILURE,
    }
}

fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// アクションを実行し、成功したかを返す。
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = AppConfig::from_cli(cli)?;
    let signer = S3Signer::new(config.signer.clone())?;

    check_connectivity(&signer, config.locator.bucket(), config.log_level).await;

    match config.action {
        Action::Generate => {
            let policy = build_policy(
                &config.locator,
                config.max_size_mb,
                config.content_type.as_deref(),
                Some(config.acl),
            );
            let request = signer
                .sign_upload(&config.locator, &policy, config.expiration_secs)
                .await?;
            let file_hint = config
                .file
                .as_ref()
                .map(|f| f.to_string_lossy().into_owned());
            print!(
                "{}",
                render::render_generate(&request, config.max_size_mb, file_hint.as_deref())
            );
            Ok(true)
        }
        Action::Upload => {
            let Some(file) = config.file.as_deref() else {
                return Err(ConfigError::MissingFile.into());
            };
            let policy = build_policy(
                &config.locator,
                config.max_size_mb,
                config.content_type.as_deref(),
                Some(config.acl),
            );
            let request = signer
                .sign_upload(&config.locator, &policy, config.expiration_secs)
                .await?;
            let outcome = UploadExecutor::new(config.transfer.clone())?
                .upload(&request, file, config.content_type.as_deref())
                .await;
            Ok(report(&outcome))
        }
        Action::Download => {
            let request = signer
                .sign_download(&config.locator, config.expiration_secs)
                .await?;
            let outcome = DownloadExecutor::new(config.transfer.clone())?
                .download(&request, config.output.as_deref())
                .await;
            Ok(report(&outcome))
        }
    }
}

/// 転送結果を表示し、成功したかを返す。
fn report(outcome: &TransferOutcome) -> bool {
    if outcome.success {
        println!("{}", outcome.message);
    } else {
        eprintln!("エラー: {}", outcome.message);
    }
    outcome.success
}
