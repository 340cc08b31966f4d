//! # s3presign Core
//!
//! POSTアップロードポリシーの構築と検証を実装する。
//!
//! ## 処理フロー
//! 1. ロケータ・サイズ上限・ACL・Content-Type からフォームフィールドと条件を組み立てる
//! 2. 署名前にフィールドと条件の対称性を検証する
//!
//! プロバイダは完全一致でポリシーを評価するため、フォームにあって条件にない
//! フィールド（またはその逆）はアップロード時点で拒否される。
//! 本モジュールの出力はネットワークに触れずにデータだけで検証できる。

pub mod error_body;
pub mod filename;

use std::num::NonZeroU32;
use std::path::Path;

use s3presign_types::{Acl, Condition, FormFields, ObjectLocator, UploadPolicy};

/// 1 MiB（バイト）
pub const MIB: u64 = 1024 * 1024;

/// 拡張子から推定できない場合のContent-Type
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// ポリシーに決して含めてはならないフィールド。
/// 対象プロバイダはアップロード後ステータスの指定を拒否する。
pub const FORBIDDEN_FIELDS: &[&str] = &["success_action_status"];

/// ポリシー不変条件の違反。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    /// 条件に対応するフィールドがない、または値が異なる
    #[error("条件 {field} に一致するフォームフィールドがありません")]
    ConditionWithoutField { field: String },
    /// フィールドに対応する条件がない
    #[error("フォームフィールド {field} に対応する条件がありません")]
    FieldWithoutCondition { field: String },
    /// 同じフィールドに複数の条件がある
    #[error("フィールド {field} に複数の条件があります")]
    DuplicateCondition { field: String },
    /// 禁止フィールドが含まれている
    #[error("使用できないフィールドが含まれています: {field}")]
    ForbiddenField { field: String },
    /// サイズ条件がちょうど1つではない
    #[error("サイズ条件はちょうど1つ必要です（実際: {count}）")]
    SizeRangeCount { count: usize },
    /// サイズ条件の範囲が不正
    #[error("サイズ条件の範囲が不正です: [{min}, {max}]")]
    SizeRangeBounds { min: u64, max: u64 },
}

// ---------------------------------------------------------------------------
// PolicyBuilder
// ---------------------------------------------------------------------------

/// POSTアップロードポリシーを構築する。
///
/// 条件の順序は
/// `SizeRange(1, max) → key → bucket → [acl] → [Content-Type]`
/// で固定され、フィールドも同じ順序で並ぶ。
/// 呼び出し側が要求したもの以外のフィールド・条件は一切追加しない。
pub fn build_policy(
    locator: &ObjectLocator,
    max_size_mb: NonZeroU32,
    content_type: Option<&str>,
    acl: Option<Acl>,
) -> UploadPolicy {
    let mut fields = FormFields::new();
    let mut conditions = vec![Condition::SizeRange {
        min: 1,
        max: u64::from(max_size_mb.get()) * MIB,
    }];

    let mut mirror = |field: &str, value: &str| {
        conditions.push(Condition::exact(field, value));
        fields.insert(field, value);
    };

    mirror("key", locator.key());
    mirror("bucket", locator.bucket());
    if let Some(acl) = acl {
        mirror("acl", acl.as_str());
    }
    if let Some(content_type) = content_type {
        mirror("Content-Type", content_type);
    }

    UploadPolicy { fields, conditions }
}

/// ポリシーの不変条件を検証する。
///
/// - 全ての完全一致条件は同名・同値のフィールドを持つ
/// - 全てのフィールドはちょうど1つの完全一致条件を持つ
/// - 禁止フィールドを含まない
/// - サイズ条件はちょうど1つで、`1 <= min <= max`
pub fn check_policy(policy: &UploadPolicy) -> Result<(), PolicyViolation> {
    let mut size_ranges = 0usize;
    let mut seen: Vec<&str> = Vec::with_capacity(policy.conditions.len());

    for condition in &policy.conditions {
        match condition {
            Condition::SizeRange { min, max } => {
                size_ranges += 1;
                if *min < 1 || min > max {
                    return Err(PolicyViolation::SizeRangeBounds {
                        min: *min,
                        max: *max,
                    });
                }
            }
            Condition::ExactMatch { field, value } => {
                if FORBIDDEN_FIELDS.contains(&field.as_str()) {
                    return Err(PolicyViolation::ForbiddenField {
                        field: field.clone(),
                    });
                }
                if seen.contains(&field.as_str()) {
                    return Err(PolicyViolation::DuplicateCondition {
                        field: field.clone(),
                    });
                }
                if policy.fields.get(field) != Some(value.as_str()) {
                    return Err(PolicyViolation::ConditionWithoutField {
                        field: field.clone(),
                    });
                }
                seen.push(field);
            }
        }
    }

    if size_ranges != 1 {
        return Err(PolicyViolation::SizeRangeCount { count: size_ranges });
    }

    for name in policy.fields.names() {
        if FORBIDDEN_FIELDS.contains(&name) {
            return Err(PolicyViolation::ForbiddenField {
                field: name.to_string(),
            });
        }
        if !seen.contains(&name) {
            return Err(PolicyViolation::FieldWithoutCondition {
                field: name.to_string(),
            });
        }
    }

    Ok(())
}

/// ファイル名の拡張子からContent-Typeを推定する。
/// 推定できない場合は `application/octet-stream`。
pub fn infer_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}
