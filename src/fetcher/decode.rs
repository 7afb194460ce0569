use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::fetcher::types::Charset;

/// Bytes of the body searched for an in-document charset declaration.
const SNIFF_LEN: usize = 4096;

static HEADER_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

// Covers both <meta charset=...> and the http-equiv content-type form.
static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s[^>]*?charset\s*=\s*["']?([^"'\s;/>]+)"#).unwrap()
});

/// Pick the body encoding: Content-Type header, then a `<meta>` declaration
/// near the top of the document, then statistical detection.
pub fn detect_charset(content_type: Option<&str>, body: &[u8]) -> Charset {
    let declared = content_type
        .and_then(|value| HEADER_CHARSET.captures(value))
        .and_then(|caps| Charset::from_label(&caps[1]));
    if let Some(charset) = declared {
        return charset;
    }

    let head = &body[..body.len().min(SNIFF_LEN)];
    let head_text = String::from_utf8_lossy(head);
    if let Some(charset) = META_CHARSET
        .captures(&head_text)
        .and_then(|caps| Charset::from_label(&caps[1]))
    {
        return charset;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, body.len() <= SNIFF_LEN);
    detector.guess(None, true).into()
}

/// Decode to UTF-8. Malformed sequences become U+FFFD rather than failing
/// the page.
pub fn decode_body(body: &[u8], charset: Charset) -> String {
    let (text, actual, had_errors) = charset.encoding().decode(body);
    if had_errors {
        warn!("Body had malformed {} sequences; replaced", actual.name());
    }
    text.into_owned()
}
