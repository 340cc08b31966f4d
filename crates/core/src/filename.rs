//! # ダウンロード先ファイル名の解決
//!
//! 優先順位:
//! 1. `Content-Disposition` ヘッダの `filename` パラメータ
//! 2. リクエストURLの最後のパスセグメント（クエリ文字列を除く）
//! 3. 固定のフォールバック名
//!
//! いずれの候補も最後のパス要素だけに縮約され、保存先ディレクトリの外を
//! 指すことはない。

/// どの候補も使えない場合のファイル名
pub const FALLBACK_FILENAME: &str = "downloaded_file";

/// ダウンロード先のファイル名を決める。
pub fn resolve_filename(content_disposition: Option<&str>, url: &str) -> String {
    content_disposition
        .and_then(filename_from_content_disposition)
        .or_else(|| filename_from_url(url))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// `Content-Disposition` から `filename` を取り出す。
/// `filename*`（RFC 5987形式）は扱わない。
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("filename"))
        .and_then(|(_, value)| {
            let value = value.trim();
            let unquoted = match value.strip_prefix('"') {
                Some(rest) => rest.strip_suffix('"')?,
                None => value,
            };
            sanitize(unquoted)
        })
}

/// URLの最後のパスセグメントをパーセントデコードして返す。
pub fn filename_from_url(url: &str) -> Option<String> {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string),
    }?;
    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);
    sanitize(&decoded)
}

/// 最後のパス要素だけを残す。空・`.`・`..` は不採用。
fn sanitize(candidate: &str) -> Option<String> {
    let last = candidate.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." || last.contains('\0') {
        return None;
    }
    Some(last.to_string())
}
