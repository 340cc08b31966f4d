//! # GETダウンロード実行器
//!
//! ## 処理フロー
//! 1. 署名付きURLへGETを送り、ステータスを確認する（200以外なら何も書かない）
//! 2. 保存先を決める（明示パス → Content-Disposition → URL末尾 → 固定名）
//! 3. 保存先ディレクトリを作成する
//! 4. 同じディレクトリの一時ファイル `.<name>.part` へチャンク単位で書き込む
//! 5. 完了後に保存先へリネームする。途中で失敗・中断したら一時ファイルを削除する

use std::path::{Path, PathBuf};

use futures_util::TryStreamExt;
use s3presign_core::error_body::describe_error_body;
use s3presign_core::filename::resolve_filename;
use s3presign_types::{SignedDownloadRequest, TransferOutcome};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

use crate::{build_client, TransferConfig, TransferError};

/// GETダウンロード実行器。
pub struct DownloadExecutor {
    client: reqwest::Client,
    config: TransferConfig,
}

impl DownloadExecutor {
    pub fn new(config: TransferConfig) -> Result<Self, TransferError> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }

    /// オブジェクトをダウンロードする。失敗はすべて結果に含めて返す。
    ///
    /// `output_path` が既存のディレクトリを指す場合は、その中に解決したファイル名で保存する。
    pub async fn download(
        &self,
        request: &SignedDownloadRequest,
        output_path: Option<&Path>,
    ) -> TransferOutcome {
        match self.try_download(request, output_path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    bucket = %request.locator.bucket(),
                    key = %request.locator.key(),
                    error = %e,
                    "ダウンロード失敗"
                );
                e.into_outcome()
            }
        }
    }

    async fn try_download(
        &self,
        request: &SignedDownloadRequest,
        output_path: Option<&Path>,
    ) -> Result<TransferOutcome, TransferError> {
        let response = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| TransferError::from_reqwest(e, self.config.timeout))?;

        let status = response.status().as_u16();
        if self.config.log_level.is_verbose() {
            tracing::debug!(status, headers = ?response.headers(), "レスポンス");
        }
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(TransferError::Rejected {
                status,
                detail: describe_error_body(&body),
            });
        }

        let content_disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let resolved = || resolve_filename(content_disposition.as_deref(), &request.url);
        let destination = match output_path {
            Some(path) if tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir()) => {
                path.join(resolved())
            }
            Some(path) => path.to_path_buf(),
            None => self.config.download_dir.join(resolved()),
        };

        let temp = part_path(&destination)?;
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| TransferError::LocalIo {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        // 失敗時も中断（futureのdrop）時も一時ファイルを消す
        let guard = PartFile::new(temp);
        let written = self.stream_to_file(response, guard.path()).await?;
        tokio::fs::rename(guard.path(), &destination)
            .await
            .map_err(|source| TransferError::LocalIo {
                path: destination.clone(),
                source,
            })?;
        guard.keep();

        tracing::info!(
            path = %destination.display(),
            bytes = written,
            "ダウンロード完了"
        );
        Ok(TransferOutcome::succeeded(
            format!(
                "ダウンロード完了: {} ({written} バイト)",
                destination.display()
            ),
            written,
        ))
    }

    /// レスポンスボディを固定サイズのチャンクでファイルに書き込み、書き込んだバイト数を返す。
    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        path: &Path,
    ) -> Result<u64, TransferError> {
        let local_io = |source: std::io::Error| TransferError::LocalIo {
            path: path.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::File::create(path).await.map_err(local_io)?;

        let stream = response.bytes_stream().map_err(|e| {
            let kind = if e.is_timeout() {
                std::io::ErrorKind::TimedOut
            } else {
                std::io::ErrorKind::Other
            };
            std::io::Error::new(kind, e.without_url())
        });
        let mut reader = std::pin::pin!(StreamReader::new(stream));
        let mut buf = vec![0u8; self.config.effective_chunk_size()];
        let mut written: u64 = 0;

        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| TransferError::from_stream_io(e, self.config.timeout))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await.map_err(local_io)?;
            written += n as u64;
        }
        file.flush().await.map_err(local_io)?;
        file.sync_all().await.map_err(local_io)?;

        Ok(written)
    }
}

/// 書き込み中の一時ファイル。`keep` されずにdropされたら削除する。
struct PartFile {
    path: PathBuf,
    armed: bool,
}

impl PartFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// リネーム済みなので削除しない。
    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// 保存先と同じディレクトリの一時ファイルパス。
fn part_path(destination: &Path) -> Result<PathBuf, TransferError> {
    let name = destination
        .file_name()
        .ok_or_else(|| TransferError::LocalIo {
            path: destination.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "保存先にファイル名がありません",
            ),
        })?;
    Ok(destination.with_file_name(format!(".{}.part", name.to_string_lossy())))
}
