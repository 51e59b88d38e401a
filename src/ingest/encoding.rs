// src/ingest/encoding.rs
//! Charset sniffing for fetched feed bodies.
//!
//! Several upstream feeds still declare iso-8859-1 or windows-1252 in their
//! XML prolog; decoding those as UTF-8 mangles every accented character in
//! titles and venue names.

use once_cell::sync::OnceCell;
use regex::Regex;

/// How many leading bytes we scan for the XML prolog.
const SNIFF_WINDOW: usize = 200;

/// Return the encoding label declared in an XML prolog, lowercased, or
/// `"utf-8"` when none is declared. Pure function; the label is not validated
/// against the set of supported decoders.
pub fn sniff_encoding(bytes: &[u8]) -> String {
    static RE_ENC: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENC
        .get_or_init(|| Regex::new(r#"(?i)encoding\s*=\s*["']([^"']+)["']"#).unwrap());

    let head = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    let ascii = String::from_utf8_lossy(head);
    re.captures(&ascii)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_else(|| "utf-8".to_string())
}

/// Decode a raw feed body using its declared encoding. Unknown labels fall
/// back to UTF-8 (lossy), so this never fails.
pub fn decode_bytes(bytes: &[u8]) -> String {
    let label = sniff_encoding(bytes);
    let enc = encoding_rs::Encoding::for_label(label.as_bytes()).unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = enc.decode(bytes);
    text.into_owned()
}
