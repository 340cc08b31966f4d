//! # 転送テスト用共通ヘルパー
//!
//! upload, downloadテストで共有するモックストアと署名済みリクエスト。

use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use s3presign_types::{FormFields, ObjectLocator, SignedDownloadRequest, SignedUploadRequest};

/// テスト用モックHTTPサーバーを起動し、ポート番号を返す。
pub async fn serve(app: axum::Router) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    port
}

/// モックストアが受け取ったmultipartパート。
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// 受信パートの記録先
pub type Received = Arc<Mutex<Vec<ReceivedPart>>>;

/// `POST /bucket` でmultipartを受け取り、指定ステータスとボディを返すモックストアを起動する。
pub async fn start_mock_post(status: StatusCode, body: &'static str) -> (u16, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));

    async fn handler(
        State((received, status, body)): State<(Received, StatusCode, &'static str)>,
        mut multipart: Multipart,
    ) -> (StatusCode, &'static str) {
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.unwrap().to_vec();
            received.lock().unwrap().push(ReceivedPart {
                name,
                file_name,
                content_type,
                data,
            });
        }
        (status, body)
    }

    let app = axum::Router::new()
        .route("/bucket", post(handler))
        .with_state((received.clone(), status, body));
    (serve(app).await, received)
}

/// モックストア宛ての署名済みPOSTリクエスト。
pub fn upload_request(port: u16, fields: &[(&str, &str)]) -> SignedUploadRequest {
    let policy_fields: FormFields = fields.iter().copied().collect();
    SignedUploadRequest {
        url: format!("http://127.0.0.1:{port}/bucket"),
        policy_fields,
        expires_in_secs: 3600,
        locator: ObjectLocator::new("bucket", "uploads/hello.txt").unwrap(),
    }
}

/// モックストア宛ての署名済みGETリクエスト。
pub fn download_request(port: u16, path_and_query: &str) -> SignedDownloadRequest {
    SignedDownloadRequest {
        url: format!("http://127.0.0.1:{port}{path_and_query}"),
        expires_in_secs: 3600,
        locator: ObjectLocator::new("bucket", "uploads/hello.txt").unwrap(),
    }
}
