//! Byte-level decoding of raw exports.
//!
//! The upstream site serves its "spreadsheet" downloads as HTML, sometimes in
//! UTF-8 and sometimes in a legacy Korean code page. Decoding order:
//! 1. A byte-order mark wins.
//! 2. Valid UTF-8 is taken as-is.
//! 3. Otherwise the encoding is guessed with `chardetng`.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use std::borrow::Cow;

/// Decode raw file bytes into text. Never fails: undecodable sequences become U+FFFD.
pub fn decode_bytes(bytes: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text;
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text
}
