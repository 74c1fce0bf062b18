//! Character encoding detection for HTML bodies.
//!
//! Only the first 64KB are scanned. A `<meta charset>` declaration beats a
//! `<meta http-equiv="content-type">` one; labels the decoder does not know
//! fall back to UTF-8. Resolution never fails.

use std::borrow::Cow;
use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;

const SCAN_LIMIT: usize = 64 * 1024;

static HTTP_EQUIV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+http-equiv\s*=\s*["']?content-type["']?\s+content\s*=\s*["']([^"']*)["']"#)
        .expect("invalid regex")
});

static CHARSET_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^\s;"']+)"#).expect("invalid regex"));

static META_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+charset\s*=\s*["']?([^\s"'/>]+)"#).expect("invalid regex"));

/// Spellings seen in the wild that are not WHATWG labels.
const ALIASES: &[(&str, &str)] = &[
    ("cp932", "windows-31j"),
    ("ms_932", "windows-31j"),
    ("euc_jp", "euc-jp"),
    ("eucjp", "euc-jp"),
    ("ujis", "euc-jp"),
    ("utf_8", "utf-8"),
    ("cp936", "gbk"),
    ("euc_kr", "euc-kr"),
    ("cp949", "euc-kr"),
];

/// The label declared by the document's meta tags, lowercased.
pub fn declared_label(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(SCAN_LIMIT)];

    let mut label = HTTP_EQUIV
        .captures(head)
        .and_then(|c| c.get(1))
        .and_then(|content| CHARSET_PARAM.captures(content.as_bytes()))
        .and_then(|c| c.get(1))
        .map(|m| m.as_bytes());

    if let Some(m) = META_CHARSET.captures(head).and_then(|c| c.get(1)) {
        label = Some(m.as_bytes());
    }

    label.map(|l| String::from_utf8_lossy(l).to_ascii_lowercase())
}

/// Map a label to a decodable encoding, or `None` if it is unknown.
pub fn lookup(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().to_ascii_lowercase();
    let label = ALIASES.iter().find(|(alias, _)| *alias == label).map_or(label.as_str(), |(_, target)| *target);
    // UTF-16 and "replacement" labels in markup mean UTF-8.
    Encoding::for_label(label.as_bytes()).map(Encoding::output_encoding)
}

/// Encoding to decode `body` with.
pub fn resolve(body: &[u8]) -> &'static Encoding {
    declared_label(body).as_deref().and_then(lookup).unwrap_or(UTF_8)
}

/// Decode `body` to text. A byte order mark overrides the declared charset.
pub fn decode(body: &[u8]) -> (Cow<'_, str>, &'static Encoding) {
    let declared = resolve(body);
    let (text, used, had_errors) = declared.decode(body);
    if had_errors {
        tracing::debug!(encoding = used.name(), "replaced malformed sequences while decoding");
    }
    (text, used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{EUC_JP, SHIFT_JIS, WINDOWS_1252};

    #[test]
    fn test_no_declaration_is_utf8() {
        assert_eq!(resolve(b"<html><head><title>x</title></head></html>"), UTF_8);
        assert_eq!(resolve(b""), UTF_8);
    }

    #[test]
    fn test_http_equiv() {
        let body = br#"<meta http-equiv="Content-Type" content="text/html; charset=Shift_JIS">"#;
        assert_eq!(declared_label(body).as_deref(), Some("shift_jis"));
        assert_eq!(resolve(body), SHIFT_JIS);
    }

    #[test]
    fn test_meta_charset_overrides_http_equiv() {
        let body = br#"<meta http-equiv="content-type" content="text/html; charset=euc-jp"><META CHARSET="windows-1252">"#;
        assert_eq!(resolve(body), WINDOWS_1252);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(lookup("sjis"), Some(SHIFT_JIS));
        assert_eq!(lookup("x-sjis"), Some(SHIFT_JIS));
        assert_eq!(lookup("CP932"), Some(SHIFT_JIS));
        assert_eq!(lookup("euc_jp"), Some(EUC_JP));
        assert_eq!(lookup("utf8"), Some(UTF_8));
    }

    #[test]
    fn test_unknown_label_falls_back() {
        assert_eq!(lookup("klingon"), None);
        assert_eq!(resolve(br#"<meta charset="klingon">"#), UTF_8);
    }

    #[test]
    fn test_utf16_declaration_means_utf8() {
        assert_eq!(resolve(br#"<meta charset="utf-16">"#), UTF_8);
    }

    #[test]
    fn test_declaration_past_scan_limit_ignored() {
        let mut body = vec![b' '; SCAN_LIMIT];
        body.extend_from_slice(br#"<meta charset="shift_jis">"#);
        assert_eq!(resolve(&body), UTF_8);
    }

    #[test]
    fn test_decode_shift_jis() {
        let mut body = br#"<meta charset="shift_jis"><title>"#.to_vec();
        let (encoded, _, _) = SHIFT_JIS.encode("日本語");
        body.extend_from_slice(&encoded);
        body.extend_from_slice(b"</title>");

        let (text, used) = decode(&body);
        assert_eq!(used, SHIFT_JIS);
        assert!(text.contains("<title>日本語</title>"));
    }

    #[test]
    fn test_decode_bom_wins() {
        let mut body = vec![0xEF, 0xBB, 0xBF];
        body.extend_from_slice(r#"<meta charset="windows-1252"><title>é</title>"#.as_bytes());
        let (text, used) = decode(&body);
        assert_eq!(used, UTF_8);
        assert!(text.contains("<title>é</title>"));
    }
}
