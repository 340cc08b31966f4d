//! # POSTポリシーのSigV4署名
//!
//! ブラウザベースのPOSTアップロード用に、ポリシー文書を組み立てて署名する。
//!
//! ## 手順
//! 1. ポリシー条件に `x-amz-algorithm` / `x-amz-credential` / `x-amz-date`
//!    （と任意の `x-amz-security-token`）を加え、有効期限付きのJSON文書にする
//! 2. JSONをBase64エンコードしたものが `policy` フィールドになる
//! 3. 日付・リージョン・サービスから導出した署名鍵で `policy` をHMAC-SHA256署名する
//!
//! 追加する署名メタデータはすべて条件とフィールドの両方に現れるため、
//! 呼び出し元ポリシーの対称性は保たれる。

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use s3presign_types::{Condition, FormFields, ObjectLocator, SignedUploadRequest, UploadPolicy};
use serde_json::{json, Value};
use sha2::Sha256;

use crate::{SigningError, SigningErrorCode, StoreCredentials};

/// 署名アルゴリズム名
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
/// SigV4のサービス名
const SERVICE: &str = "s3";
/// SigV4スコープの終端
const TERMINATOR: &str = "aws4_request";

/// POSTポリシー署名に必要な入力。
pub struct PostPolicyInput<'a> {
    pub credentials: &'a StoreCredentials,
    pub region: &'a str,
    pub endpoint: &'a str,
    pub locator: &'a ObjectLocator,
    pub policy: &'a UploadPolicy,
    pub expires_in_secs: u32,
    /// 署名時刻（テストでは固定する）
    pub now: DateTime<Utc>,
}

/// ポリシーに署名し、フォームフィールドにメタデータを追加した署名済みリクエストを返す。
pub fn sign_post_policy(input: PostPolicyInput<'_>) -> Result<SignedUploadRequest, SigningError> {
    let url = upload_url(input.endpoint, input.locator.bucket())?;

    let amz_date = input.now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = input.now.format("%Y%m%d").to_string();
    let credential = format!(
        "{}/{}",
        input.credentials.access_key,
        scope(&date, input.region)
    );

    let mut metadata = FormFields::new();
    metadata.insert("x-amz-algorithm", ALGORITHM);
    metadata.insert("x-amz-credential", credential);
    metadata.insert("x-amz-date", amz_date);
    if let Some(token) = &input.credentials.session_token {
        metadata.insert("x-amz-security-token", token.as_str());
    }

    let expiration = input.now + Duration::seconds(i64::from(input.expires_in_secs));
    let document = policy_document(input.policy, &metadata, expiration);
    let encoded = base64::engine::general_purpose::STANDARD.encode(document.to_string());

    let signing_key = derive_signing_key(&input.credentials.secret_key, &date, input.region)?;
    let signature = hex::encode(hmac_sign(&signing_key, encoded.as_bytes())?);

    let mut policy_fields = input.policy.fields.clone();
    for (name, value) in metadata.iter() {
        policy_fields.insert(name, value);
    }
    policy_fields.insert("policy", encoded);
    policy_fields.insert("x-amz-signature", signature);

    Ok(SignedUploadRequest {
        url,
        policy_fields,
        expires_in_secs: input.expires_in_secs,
        locator: input.locator.clone(),
    })
}

/// ポリシー文書（JSON）を組み立てる。
///
/// 条件の順序はポリシーの条件 → 署名メタデータ。
pub fn policy_document(
    policy: &UploadPolicy,
    metadata: &FormFields,
    expiration: DateTime<Utc>,
) -> Value {
    let mut conditions: Vec<Value> = policy.conditions.iter().map(condition_json).collect();
    conditions.extend(metadata.iter().map(|(name, value)| json!({ name: value })));

    json!({
        "expiration": expiration.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        "conditions": conditions,
    })
}

fn condition_json(condition: &Condition) -> Value {
    match condition {
        Condition::SizeRange { min, max } => json!(["content-length-range", min, max]),
        Condition::ExactMatch { field, value } => json!({ field.as_str(): value }),
    }
}

/// POST先URL（パス形式）: `{endpoint}/{bucket}`
fn upload_url(endpoint: &str, bucket: &str) -> Result<String, SigningError> {
    let parsed = url::Url::parse(endpoint).map_err(|e| {
        SigningError::new(
            SigningErrorCode::InvalidEndpoint,
            format!("エンドポイントURLが不正です: {endpoint}: {e}"),
        )
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(SigningError::new(
            SigningErrorCode::InvalidEndpoint,
            format!("エンドポイントはhttp(s)のURLである必要があります: {endpoint}"),
        ));
    }
    Ok(format!("{}/{}", endpoint.trim_end_matches('/'), bucket))
}

fn scope(date: &str, region: &str) -> String {
    format!("{date}/{region}/{SERVICE}/{TERMINATOR}")
}

fn derive_signing_key(secret: &str, date: &str, region: &str) -> Result<Vec<u8>, SigningError> {
    let k_date = hmac_sign(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let k_region = hmac_sign(&k_date, region.as_bytes())?;
    let k_service = hmac_sign(&k_region, SERVICE.as_bytes())?;
    hmac_sign(&k_service, TERMINATOR.as_bytes())
}

fn hmac_sign(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|e| {
        SigningError::new(SigningErrorCode::Credentials, format!("署名鍵を初期化できません: {e}"))
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
