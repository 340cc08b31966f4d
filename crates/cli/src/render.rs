//! # generate の出力
//!
//! 署名済みPOSTリクエストから、人間向けの説明・HTMLフォーム・curlコマンドを作る。
//! いずれもフォームフィールドの順序と値をそのまま保つ。

use std::fmt::Write as _;
use std::num::NonZeroU32;

use s3presign_types::SignedUploadRequest;

/// ファイル指定がないときのcurl例のファイル名
const FILE_PLACEHOLDER: &str = "yourfile.ext";

/// generate の出力全体。
pub fn render_generate(
    request: &SignedUploadRequest,
    max_size_mb: NonZeroU32,
    file_hint: Option<&str>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== 署名付きPOSTアップロード ===");
    let _ = writeln!(out, "バケット: {}", request.locator.bucket());
    let _ = writeln!(out, "オブジェクト: {}", request.locator.key());
    let _ = writeln!(out, "有効期限: {} 秒", request.expires_in_secs);
    let _ = writeln!(out, "最大サイズ: {max_size_mb} MB");
    let _ = writeln!(out);
    let _ = writeln!(out, "URL:");
    let _ = writeln!(out, "{}", request.url);
    let _ = writeln!(out);
    let _ = writeln!(out, "フォームフィールド:");
    for (name, value) in request.policy_fields.iter() {
        let _ = writeln!(out, "  {name}: {value}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "HTMLフォーム:");
    out.push_str(&html_form(request));
    let _ = writeln!(out);
    let _ = writeln!(out, "curl:");
    out.push_str(&curl_command(request, file_hint.unwrap_or(FILE_PLACEHOLDER)));
    out
}

/// 全フィールドをhiddenで持つアップロードフォーム。
pub fn html_form(request: &SignedUploadRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<form action="{}" method="post" enctype="multipart/form-data">"#,
        html_escape(&request.url)
    );
    for (name, value) in request.policy_fields.iter() {
        let _ = writeln!(
            out,
            r#"  <input type="hidden" name="{}" value="{}" />"#,
            html_escape(name),
            html_escape(value)
        );
    }
    let _ = writeln!(out, r#"  <input type="file" name="file" />"#);
    let _ = writeln!(out, r#"  <input type="submit" value="Upload" />"#);
    let _ = writeln!(out, "</form>");
    out
}

/// 同じアップロードを行うcurlコマンド。
pub fn curl_command(request: &SignedUploadRequest, file: &str) -> String {
    let mut out = String::from("curl -X POST \\\n");
    for (name, value) in request.policy_fields.iter() {
        let _ = writeln!(out, "  -F {} \\", shell_quote(&format!("{name}={value}")));
    }
    let _ = writeln!(out, "  -F {} \\", shell_quote(&format!("file=@{file}")));
    let _ = writeln!(out, "  {}", shell_quote(&request.url));
    out
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// シングルクォートで囲む。内部の `'` は `'\''` に置き換える。
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3presign_types::{FormFields, ObjectLocator};

    fn request() -> SignedUploadRequest {
        let fields: FormFields = [
            ("key", "dir/it's <mine>.txt"),
            ("bucket", "b"),
            ("acl", "private"),
            ("policy", "eyJhIjoiYiJ9"),
            ("x-amz-signature", "abcd"),
        ]
        .into_iter()
        .collect();
        SignedUploadRequest {
            url: "https://storage.yandexcloud.net/b".to_string(),
            policy_fields: fields,
            expires_in_secs: 3600,
            locator: ObjectLocator::new("b", "dir/it's <mine>.txt").unwrap(),
        }
    }

    #[test]
    fn test_html_form_escapes_and_keeps_order() {
        let form = html_form(&request());
        assert!(form.starts_with(
            r#"<form action="https://storage.yandexcloud.net/b" method="post" enctype="multipart/form-data">"#
        ));
        assert!(form.contains(
            r#"<input type="hidden" name="key" value="dir/it&#39;s &lt;mine&gt;.txt" />"#
        ));
        let key_at = form.find(r#"name="key""#).unwrap();
        let bucket_at = form.find(r#"name="bucket""#).unwrap();
        let sig_at = form.find(r#"name="x-amz-signature""#).unwrap();
        let file_at = form.find(r#"type="file""#).unwrap();
        assert!(key_at < bucket_at && bucket_at < sig_at && sig_at < file_at);
        assert!(form.trim_end().ends_with("</form>"));
    }

    #[test]
    fn test_curl_command_quotes_values() {
        let curl = curl_command(&request(), "photo.jpg");
        let lines: Vec<&str> = curl.lines().collect();
        assert_eq!(lines[0], "curl -X POST \\");
        assert_eq!(lines[1], r"  -F 'key=dir/it'\''s <mine>.txt' \");
        assert_eq!(lines[2], r"  -F 'bucket=b' \");
        assert_eq!(lines[6], r"  -F 'file=@photo.jpg' \");
        assert_eq!(lines[7], "  'https://storage.yandexcloud.net/b'");
    }

    #[test]
    fn test_render_generate_summary() {
        let out = render_generate(&request(), NonZeroU32::new(5).unwrap(), None);
        assert!(out.contains("バケット: b"));
        assert!(out.contains("有効期限: 3600 秒"));
        assert!(out.contains("最大サイズ: 5 MB"));
        assert!(out.contains("  policy: eyJhIjoiYiJ9"));
        assert!(out.contains("file=@yourfile.ext"));
        assert!(!out.contains("success_action_status"));
    }
}
