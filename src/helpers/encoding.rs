//! Ordered text decoding for downloaded worksheet bodies.

use encoding_rs::Encoding;
use encoding_rs::UTF_8;

/// Legacy code pages tried after strict UTF-8: ISO-8859-15, then Windows-1252.
/// ISO-8859-1 (28591) is not listed since encoding_rs resolves it to Windows-1252.
const LEGACY_CODE_PAGES: [u16; 2] = [28605, 1252];

const UTF_8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encodings in the order they are attempted, without duplicates.
pub(crate) fn candidate_encodings() -> Vec<&'static Encoding> {
    let mut encodings = vec![UTF_8];
    for encoding in LEGACY_CODE_PAGES.iter().filter_map(|code_page| codepage::to_encoding(*code_page)) {
        if !encodings.contains(&encoding) {
            encodings.push(encoding);
        }
    }
    encodings
}

/// Decodes without replacement characters; `None` when the bytes are malformed for the encoding.
pub(crate) fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let bytes = if encoding == UTF_8 {
        bytes.strip_prefix(UTF_8_BOM).unwrap_or(bytes)
    } else {
        bytes
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

/// Every successful decoding of `bytes`, in attempt order.
pub(crate) fn decodings(bytes: &[u8]) -> impl Iterator<Item = (&'static Encoding, String)> + '_ {
    candidate_encodings()
        .into_iter()
        .filter_map(move |encoding| decode_strict(bytes, encoding).map(|text| (encoding, text)))
}
