//! # S3エラーレスポンスの解析
//!
//! ストアが返す `<Error><Code>..</Code><Message>..</Message></Error>` から
//! コードとメッセージを取り出す。解析はベストエフォートで、失敗しても
//! 呼び出し元の失敗経路を中断しない（生のボディ断片に縮退する）。

use serde::Deserialize;

/// 失敗メッセージに含める生ボディ断片の最大文字数
pub const RAW_FRAGMENT_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct S3ErrorXml {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: Option<String>,
}

/// 解析済みのS3エラー。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub message: Option<String>,
}

/// S3エラーXMLを解析する。エラー文書でなければ None。
pub fn parse_error_body(body: &str) -> Option<ErrorBody> {
    // quick-xmlは寛容なので、ルート要素の存在を先に確かめる
    if !body.contains("<Error") {
        return None;
    }
    let parsed: S3ErrorXml = quick_xml::de::from_str(body.trim()).ok()?;
    if parsed.code.trim().is_empty() {
        return None;
    }
    Some(ErrorBody {
        code: parsed.code.trim().to_string(),
        message: parsed
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
    })
}

/// 失敗メッセージに付加する詳細を返す。
///
/// XMLとして解析できれば `Code: Message`、できなければ先頭
/// [`RAW_FRAGMENT_CHARS`] 文字の生ボディ。空ボディなら None。
pub fn describe_error_body(body: &str) -> Option<String> {
    if let Some(error) = parse_error_body(body) {
        return Some(match error.message {
            Some(message) => format!("{}: {}", error.code, message),
            None => error.code,
        });
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed, RAW_FRAGMENT_CHARS).to_string())
}

/// 文字境界を保ったまま先頭 `max_chars` 文字に切り詰める。
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_access_denied() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
  <Code>AccessDenied</Code>
  <Message>Access Denied</Message>
  <RequestId>abc123</RequestId>
</Error>"#;
        let parsed = parse_error_body(body).unwrap();
        assert_eq!(parsed.code, "AccessDenied");
        assert_eq!(parsed.message.as_deref(), Some("Access Denied"));
        assert_eq!(
            describe_error_body(body).as_deref(),
            Some("AccessDenied: Access Denied")
        );
    }

    #[test]
    fn test_code_without_message() {
        let body = "<Error><Code>AccessDenied</Code></Error>";
        assert_eq!(describe_error_body(body).as_deref(), Some("AccessDenied"));
    }

    #[test]
    fn test_non_xml_degrades_to_fragment() {
        assert_eq!(parse_error_body("upstream exploded"), None);
        assert_eq!(
            describe_error_body("  upstream exploded \n").as_deref(),
            Some("upstream exploded")
        );
        // 壊れたXMLも生ボディに縮退する
        let broken = "<Error><Code>Oops";
        assert_eq!(describe_error_body(broken).as_deref(), Some(broken));
        assert_eq!(describe_error_body("   "), None);
    }

    #[test]
    fn test_fragment_truncated_on_char_boundary() {
        let long = "あ".repeat(RAW_FRAGMENT_CHARS + 10);
        let described = describe_error_body(&long).unwrap();
        assert_eq!(described.chars().count(), RAW_FRAGMENT_CHARS);

        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
    }
}
