//! # s3presign 共有型定義
//!
//! 署名付きリクエストの構築・転送で受け渡すデータ構造を提供する。
//!
//! ## ライフサイクル
//! - `ObjectLocator` とポリシーパラメータは呼び出しごとに生成され、変更されない
//! - `SignedUploadRequest` / `SignedDownloadRequest` は署名器が一度だけ生成し、
//!   転送処理が一度だけ消費する（キャッシュ・再利用はしない）
//! - `TransferOutcome` は転送処理の終端値で、部分的に埋められることはない

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// オブジェクト識別子
// ---------------------------------------------------------------------------

/// ロケータ構築時のエラー型。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    /// バケット名が空
    #[error("バケット名が空です")]
    EmptyBucket,
    /// オブジェクトキーが空
    #[error("オブジェクトキーが空です")]
    EmptyKey,
}

/// 対象オブジェクトを識別する (bucket, key) の組。
///
/// キーは不透明な文字列として扱い、正規化は行わない。
/// "/" にも構造上の意味はない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocator {
    bucket: String,
    key: String,
}

impl ObjectLocator {
    /// バケット名とキーからロケータを構築する。どちらも空であってはならない。
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self, LocatorError> {
        let bucket = bucket.into();
        let key = key.into();
        if bucket.is_empty() {
            return Err(LocatorError::EmptyBucket);
        }
        if key.is_empty() {
            return Err(LocatorError::EmptyKey);
        }
        Ok(Self { bucket, key })
    }

    /// バケット名
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// オブジェクトキー
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

// ---------------------------------------------------------------------------
// ACL
// ---------------------------------------------------------------------------

/// アップロードされたオブジェクトに付与するcanned ACL。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Acl {
    /// 所有者のみ
    #[default]
    Private,
    /// 誰でも読み取り可能
    PublicRead,
    /// 認証済みユーザーのみ読み取り可能
    AuthenticatedRead,
}

impl Acl {
    /// ポリシー・フォームに書き込む文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::AuthenticatedRead => "authenticated-read",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Acl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Acl::Private),
            "public-read" => Ok(Acl::PublicRead),
            "authenticated-read" => Ok(Acl::AuthenticatedRead),
            other => Err(format!("未対応のACLです: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// アップロードポリシー
// ---------------------------------------------------------------------------

/// POSTポリシーの条件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// アップロードサイズの閉区間 `[min, max]`（バイト）
    SizeRange { min: u64, max: u64 },
    /// フォームフィールドの完全一致
    ExactMatch { field: String, value: String },
}

impl Condition {
    /// 完全一致条件を構築する。
    pub fn exact(field: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::ExactMatch {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// 挿入順を保持する文字列マップ。
///
/// 順序はそのままHTMLフォームのフィールド順・curl例の引数順になる。
/// 既存キーへの挿入は位置を変えずに値だけを置き換える。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    entries: Vec<(String, String)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// フィールドを追加する。同名のフィールドがあれば値を置き換える。
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 挿入順にフィールドを走査する。
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// フィールド名を挿入順に返す。
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FormFields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// POSTアップロード用のポリシー（フォームフィールド + 条件）。
///
/// 全ての完全一致条件は同名・同値のフィールドを持ち、その逆も成り立つ。
/// サイズ条件はちょうど1つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// フォームフィールド（挿入順）
    pub fields: FormFields,
    /// ポリシー条件（挿入順）
    pub conditions: Vec<Condition>,
}

impl UploadPolicy {
    /// サイズ条件を返す。
    pub fn size_range(&self) -> Option<(u64, u64)> {
        self.conditions.iter().find_map(|c| match c {
            Condition::SizeRange { min, max } => Some((*min, *max)),
            Condition::ExactMatch { .. } => None,
        })
    }
}

// ---------------------------------------------------------------------------
// 署名済みリクエスト
// ---------------------------------------------------------------------------

/// 署名済みPOSTアップロードリクエスト。
///
/// `policy_fields` はポリシーのフィールドに、署名器が付与した
/// 署名メタデータ（policy, x-amz-signature 等）を後ろに追加したもの。
#[derive(Debug, Clone)]
pub struct SignedUploadRequest {
    /// POST先URL
    pub url: String,
    /// フォームフィールド（ポリシー由来 + 署名メタデータ）
    pub policy_fields: FormFields,
    /// 署名時点からの有効期限（秒）
    pub expires_in_secs: u32,
    /// 対象オブジェクト
    pub locator: ObjectLocator,
}

/// 署名済みGETダウンロードリクエスト。
#[derive(Debug, Clone)]
pub struct SignedDownloadRequest {
    /// 署名付きURL
    pub url: String,
    /// 署名時点からの有効期限（秒）
    pub expires_in_secs: u32,
    /// 対象オブジェクト
    pub locator: ObjectLocator,
}

// ---------------------------------------------------------------------------
// 転送結果
// ---------------------------------------------------------------------------

/// 転送失敗の分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// ローカルファイルが存在しない・読めない
    FileNotFound,
    /// リクエストがタイムアウトした
    Timeout,
    /// ストアが成功以外のHTTPステータスを返した
    HttpStatus(u16),
    /// 接続失敗などの通信エラー
    Transport,
    /// 保存先への書き込み失敗
    LocalIo,
    /// リクエストを組み立てられなかった（不正なContent-Type等）
    InvalidRequest,
}

/// 転送処理の終端値。アップロード・ダウンロード共通。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// 成功したか
    pub success: bool,
    /// 人間向けのメッセージ
    pub message: String,
    /// 転送したバイト数（ダウンロードのみ、アップロードでは0）
    pub bytes_transferred: u64,
    /// 失敗の分類（成功時はNone）
    pub failure: Option<FailureKind>,
}

impl TransferOutcome {
    /// 成功結果を構築する。
    pub fn succeeded(message: impl Into<String>, bytes_transferred: u64) -> Self {
        Self {
            success: true,
            message: message.into(),
            bytes_transferred,
            failure: None,
        }
    }

    /// 失敗結果を構築する。
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            bytes_transferred: 0,
            failure: Some(kind),
        }
    }
}

// ---------------------------------------------------------------------------
// ログレベル
// ---------------------------------------------------------------------------

/// 各コンポーネントに構築時に渡すログ詳細度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// `--verbose` 指定時のレベルか
    pub fn is_verbose(&self) -> bool {
        *self >= LogLevel::Debug
    }

    /// 詳細フラグからレベルを決める。
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}
