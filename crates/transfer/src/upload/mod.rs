//! # POSTアップロード実行器
//!
//! 署名済みフォームフィールドとローカルファイルからmultipart/form-dataを組み立て、
//! ストアへ送信して結果を分類する。
//!
//! ## 処理フロー
//! 1. ローカルファイルを開く（失敗時はネットワークに触れずに終了）
//! 2. Content-Typeを決める（明示指定 → 拡張子から推定 → octet-stream）
//! 3. フォームフィールドを順序どおりに並べ、最後に `file` パートを付ける
//! 4. ファイル本体はチャンク単位でストリーミング送信する
//! 5. 200/201/204 を成功、それ以外を失敗として分類する

use std::path::Path;

use reqwest::multipart::{Form, Part};
use s3presign_core::error_body::{describe_error_body, truncate_chars};
use s3presign_core::infer_content_type;
use s3presign_types::{SignedUploadRequest, TransferOutcome};
use tokio_util::io::ReaderStream;

use crate::{build_client, TransferConfig, TransferError};

/// ファイル本体を載せるフォームフィールド名
pub const FILE_FIELD: &str = "file";

/// 成功メッセージに含めるレスポンスボディの最大文字数
pub const SUCCESS_EXCERPT_CHARS: usize = 200;

/// アップロード成功とみなすステータスコード
const SUCCESS_STATUSES: [u16; 3] = [200, 201, 204];

/// POSTアップロード実行器。
pub struct UploadExecutor {
    client: reqwest::Client,
    config: TransferConfig,
}

impl UploadExecutor {
    pub fn new(config: TransferConfig) -> Result<Self, TransferError> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }

    /// ファイルをアップロードする。失敗はすべて結果に含めて返す。
    pub async fn upload(
        &self,
        request: &SignedUploadRequest,
        file_path: &Path,
        content_type: Option<&str>,
    ) -> TransferOutcome {
        match self.try_upload(request, file_path, content_type).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    bucket = %request.locator.bucket(),
                    key = %request.locator.key(),
                    error = %e,
                    "アップロード失敗"
                );
                e.into_outcome()
            }
        }
    }

    async fn try_upload(
        &self,
        request: &SignedUploadRequest,
        file_path: &Path,
        content_type: Option<&str>,
    ) -> Result<TransferOutcome, TransferError> {
        let not_found = || TransferError::FileNotFound {
            path: file_path.to_path_buf(),
        };
        let file = tokio::fs::File::open(file_path)
            .await
            .map_err(|_| not_found())?;
        let metadata = file.metadata().await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }
        let size = metadata.len();

        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| infer_content_type(file_path));
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FILE_FIELD.to_string());

        tracing::info!(
            path = %file_path.display(),
            size,
            content_type = %content_type,
            "アップロード開始"
        );

        let stream = ReaderStream::with_capacity(file, self.config.effective_chunk_size());
        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), size)
            .file_name(file_name)
            .mime_str(&content_type)
            .map_err(|e| TransferError::InvalidContentType {
                content_type: content_type.clone(),
                reason: e.without_url().to_string(),
            })?;

        let mut form = Form::new();
        for (name, value) in request.policy_fields.iter() {
            form = form.text(name.to_string(), value.to_string());
        }
        let form = form.part(FILE_FIELD, part);

        if self.config.log_level.is_verbose() {
            tracing::debug!(url = %request.url, "POST先");
            for name in request.policy_fields.names() {
                tracing::debug!(field = %name, "送信フィールド");
            }
        }

        let response = self
            .client
            .post(&request.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransferError::from_reqwest(e, self.config.timeout))?;

        let status = response.status().as_u16();
        if self.config.log_level.is_verbose() {
            tracing::debug!(status, headers = ?response.headers(), "レスポンス");
        }
        // ボディはメッセージの補足に使うだけなので、読めなくても分類は続ける
        let body = response.text().await.unwrap_or_default();

        if !SUCCESS_STATUSES.contains(&status) {
            return Err(TransferError::Rejected {
                status,
                detail: describe_error_body(&body),
            });
        }

        let mut message = format!("アップロード成功 (HTTP {status})");
        let excerpt = truncate_chars(body.trim(), SUCCESS_EXCERPT_CHARS);
        if !excerpt.is_empty() {
            message.push_str(": ");
            message.push_str(excerpt);
        }
        tracing::info!(
            bucket = %request.locator.bucket(),
            key = %request.locator.key(),
            status,
            "アップロード完了"
        );
        Ok(TransferOutcome::succeeded(message, 0))
    }
}
