//! Message body recovery.
//!
//! Newer schema versions drop the plain `text` column for some messages
//! and store an `attributedBody` blob instead: a legacy keyed-archive
//! rich-text encoding. This module recovers readable text from that
//! blob with a chain of independent extraction strategies, then filters
//! and scores every candidate string to pick the best one. It is a
//! best-effort heuristic decoder, not a full archive parser.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;

/// Archive-internal tokens that mark a candidate as serialization
/// noise rather than message content.
const NOISE_FRAGMENTS: &[&str] = &[
    "bplist00",
    "$objects",
    "$archiver",
    "$top",
    "nsmutableattributedstring",
    "nsattributedstring",
    "nsobject",
    "nsdictionary",
    "nsstring",
    "streamtyped",
    "__kim",
];

/// Known Latin-1 misreadings of UTF-8 punctuation. Longer sequences
/// first so prefixes do not shadow them.
const MOJIBAKE_REPAIRS: &[(&str, &str)] = &[
    ("\u{e2}\u{20ac}\u{2122}", "\u{2019}"), // ’
    ("\u{e2}\u{20ac}\u{153}", "\u{201c}"),  // “
    ("\u{e2}\u{20ac}\u{201c}", "\u{2013}"), // –
    ("\u{e2}\u{20ac}\u{201d}", "\u{2014}"), // —
    ("\u{e2}\u{20ac}\u{9d}", "\u{201d}"),   // ”
    ("\u{e2}\u{20ac}\u{2dc}", "\u{2018}"),  // ‘
];

const MAX_GRAPH_DEPTH: usize = 10;

lazy_static! {
    /// Printable sentence-like runs: alphanumeric-led, length >= 8,
    /// limited to characters common in prose.
    static ref PRINTABLE_RUN: Regex =
        Regex::new(r"[A-Za-z0-9][A-Za-z0-9 ,.'!?;:()\-]{7,}").unwrap();
    static ref RTF_CONTROL: Regex = Regex::new(r"\\[a-zA-Z]+-?\d* ?|[{}]").unwrap();
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Strip object-replacement and NUL characters, collapse whitespace
/// runs to single spaces, and trim.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| *c != '\u{fffc}' && *c != '\0')
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Recover the best available text for a message.
///
/// Plain text wins whenever it survives normalization; otherwise the
/// base64-carried rich-text payload is decoded and mined. `None` means
/// no usable text exists.
pub fn decode_message_text(plain: Option<&str>, payload_b64: Option<&str>) -> Option<String> {
    if let Some(plain) = plain {
        let normalized = normalize(plain);
        if !normalized.is_empty() {
            return Some(normalized);
        }
    }

    let payload = payload_b64?;
    let bytes = BASE64.decode(payload).ok()?;
    decode_payload(&bytes)
}

/// Mine a raw rich-text payload for readable message text.
pub fn decode_payload(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }

    let mut candidates: Vec<String> = Vec::new();
    for slice in candidate_slices(bytes) {
        if let Some(text) = extract_typedstream_string(slice) {
            candidates.push(text);
        }
        candidates.extend(collect_plist_strings(slice));
        if let Some(text) = extract_document_text(slice) {
            candidates.push(text);
        }
        candidates.extend(scan_printable_runs(slice));
    }

    select_best(candidates)
}

/// The whole buffer, plus the sub-slice from a non-zero binary-plist
/// header offset when one is embedded mid-stream.
fn candidate_slices(bytes: &[u8]) -> Vec<&[u8]> {
    let mut slices = vec![bytes];
    if let Some(offset) = find_subsequence(bytes, b"bplist00") {
        if offset > 0 {
            slices.push(&bytes[offset..]);
        }
    }
    slices
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Direct string extraction from a `streamtyped` archive.
///
/// The NSString payload sits behind a `+` type marker followed by a
/// length prefix: one byte below 0x80, or 0x81 plus a little-endian
/// u16 for longer strings.
fn extract_typedstream_string(bytes: &[u8]) -> Option<String> {
    let ns = find_subsequence(bytes, b"NSString")?;
    let rest = &bytes[ns + b"NSString".len()..];
    let plus = rest.iter().position(|b| *b == b'+')?;
    let after = &rest[plus + 1..];

    let (len, start): (usize, usize) = match *after.first()? {
        0x81 => {
            let lo = *after.get(1)? as usize;
            let hi = *after.get(2)? as usize;
            (lo | (hi << 8), 3)
        }
        b if b < 0x80 => (b as usize, 1),
        _ => return None,
    };

    let end = start.checked_add(len)?;
    if end > after.len() {
        return None;
    }
    std::str::from_utf8(&after[start..end])
        .ok()
        .map(str::to_string)
}

/// Walk a binary-plist object graph collecting string leaves, bounded
/// to a fixed recursion depth.
fn collect_plist_strings(bytes: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    if !bytes.starts_with(b"bplist00") {
        return out;
    }
    if let Ok(value) = plist::Value::from_reader(std::io::Cursor::new(bytes)) {
        walk_plist(&value, 0, &mut out);
    }
    out
}

fn walk_plist(value: &plist::Value, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_GRAPH_DEPTH {
        return;
    }
    match value {
        plist::Value::String(s) => out.push(s.clone()),
        plist::Value::Array(items) => {
            for item in items {
                walk_plist(item, depth + 1, out);
            }
        }
        plist::Value::Dictionary(dict) => {
            // Keyed archives can carry text in key position too.
            for (key, item) in dict.iter() {
                out.push(key.clone());
                walk_plist(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

/// Interpret the payload as a self-describing rich-text document:
/// RTF control-word stripping, HTML tag stripping, or plain UTF-8.
fn extract_document_text(bytes: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(bytes).ok()?;
    if text.starts_with("{\\rtf") {
        return Some(RTF_CONTROL.replace_all(text, " ").into_owned());
    }
    let lower = text.to_ascii_lowercase();
    if lower.contains("<html") || lower.contains("<body") {
        return Some(HTML_TAG.replace_all(text, " ").into_owned());
    }
    Some(text.to_string())
}

/// Last-resort heuristic: scan the lossily-decoded bytes for printable
/// sentence-like runs.
fn scan_printable_runs(bytes: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    PRINTABLE_RUN
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Repair mis-encoded curly quotes and dashes.
fn repair_mojibake(text: &str) -> String {
    let mut repaired = text.to_string();
    for (bad, good) in MOJIBAKE_REPAIRS {
        if repaired.contains(bad) {
            repaired = repaired.replace(bad, good);
        }
    }
    repaired
}

fn contains_noise(text: &str) -> bool {
    let lower = text.to_lowercase();
    NOISE_FRAGMENTS.iter().any(|frag| lower.contains(frag))
}

/// Candidate score: words carry the most weight, with a bonus for
/// sentence-final punctuation.
fn score(text: &str) -> i64 {
    let words = text.split_whitespace().count() as i64;
    let letters = text.chars().filter(|c| c.is_alphabetic()).count() as i64;
    let punctuation_bonus = if text.contains(['.', '!', '?']) { 20 } else { 0 };
    words * 12 + letters + punctuation_bonus
}

/// Filter and score every candidate, returning the best survivor.
fn select_best(candidates: Vec<String>) -> Option<String> {
    candidates
        .into_iter()
        .map(|c| repair_mojibake(&normalize(&c)))
        .filter(|c| {
            if contains_noise(c) {
                return false;
            }
            let alnum = c.chars().filter(|ch| ch.is_alphanumeric()).count();
            if alnum < 4 {
                return false;
            }
            if c.split_whitespace().count() < 2 {
                return false;
            }
            !c.chars().any(char::is_control)
        })
        .max_by_key(|c| score(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }

    #[test]
    fn test_plain_text_wins_over_payload() {
        let payload = b64(b"streamtyped garbage that should never be consulted");
        let result = decode_message_text(Some("  Hello\u{fffc} there \n"), Some(&payload));
        assert_eq!(result.as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_empty_plain_text_falls_through() {
        let payload = b64("This is a real sentence for sure.".as_bytes());
        let result = decode_message_text(Some("  \u{fffc}\0  "), Some(&payload));
        assert_eq!(result.as_deref(), Some("This is a real sentence for sure."));
    }

    #[test]
    fn test_invalid_base64_means_no_text() {
        assert_eq!(decode_message_text(None, Some("!!not base64!!")), None);
        assert_eq!(decode_message_text(None, None), None);
    }

    #[test]
    fn test_noise_tokens_filtered_from_archive_payload() {
        let payload = "streamtyped NSAttributedString ... Loved \u{201c}Awesome! Thanks Trip! \
                       We'll put new bed sheets...\u{201d} NSDictionary __kIMMessagePartAttributeName";
        let result = decode_payload(payload.as_bytes()).unwrap();

        assert!(result.contains("Awesome! Thanks Trip!"));
        let lower = result.to_lowercase();
        for noise in ["streamtyped", "nsattributedstring", "nsdictionary", "__kim"] {
            assert!(!lower.contains(noise), "noise token {noise} leaked into {result:?}");
        }
    }

    #[test]
    fn test_typedstream_length_prefixed_string() {
        let mut payload = b"\x04\x0bstreamtyped garbage NSString\x01\x94\x84\x01".to_vec();
        payload.push(b'+');
        payload.push(13);
        payload.extend_from_slice(b"Hello, world!");

        let result = decode_payload(&payload).unwrap();
        assert_eq!(result, "Hello, world!");
    }

    #[test]
    fn test_typedstream_two_byte_length() {
        let body = "word ".repeat(40);
        let mut payload = b"streamtyped NSString".to_vec();
        payload.push(b'+');
        payload.push(0x81);
        payload.extend_from_slice(&(body.len() as u16).to_le_bytes());
        payload.extend_from_slice(body.as_bytes());

        let result = decode_payload(&payload).unwrap();
        assert!(result.starts_with("word word"));
    }

    #[test]
    fn test_typedstream_truncated_length_rejected() {
        // Length prefix claims more bytes than the payload holds.
        let mut payload = b"streamtyped NSString".to_vec();
        payload.push(b'+');
        payload.push(120);
        payload.extend_from_slice(b"short");

        assert_eq!(extract_typedstream_string(&payload), None);
    }

    #[test]
    fn test_plist_key_position_text_collected() {
        let mut dict = plist::Dictionary::new();
        dict.insert(
            "Text hiding in a key position here.".into(),
            plist::Value::Boolean(true),
        );
        let mut buf = Vec::new();
        plist::Value::Dictionary(dict)
            .to_writer_binary(&mut buf)
            .unwrap();

        let result = decode_payload(&buf).unwrap();
        assert_eq!(result, "Text hiding in a key position here.");
    }

    #[test]
    fn test_mojibake_repair() {
        let repaired = repair_mojibake("It\u{e2}\u{20ac}\u{2122}s done");
        assert_eq!(repaired, "It\u{2019}s done");
    }

    #[test]
    fn test_short_fragments_rejected() {
        // Fewer than 2 words and fewer than 4 alphanumerics never survive.
        assert_eq!(select_best(vec!["hi".into(), "x y".into()]), None);
    }

    #[test]
    fn test_scoring_prefers_sentence() {
        let best = select_best(vec![
            "random run of letters".into(),
            "This one is a full sentence with punctuation.".into(),
        ]);
        assert_eq!(
            best.as_deref(),
            Some("This one is a full sentence with punctuation.")
        );
    }

    #[test]
    fn test_plist_graph_walk() {
        let mut dict = plist::Dictionary::new();
        dict.insert(
            "NS.string".into(),
            plist::Value::String("A message carried in a plist graph.".into()),
        );
        let mut buf = Vec::new();
        plist::Value::Dictionary(dict)
            .to_writer_binary(&mut buf)
            .unwrap();

        // Prepend junk so the header sits at a non-zero offset.
        let mut payload = b"\x04\x0bjunkheader".to_vec();
        payload.extend_from_slice(&buf);

        let result = decode_payload(&payload).unwrap();
        assert_eq!(result, "A message carried in a plist graph.");
    }

    #[test]
    fn test_rtf_document_stripping() {
        let payload = br"{\rtf1\ansi Hello from a rich document.}";
        let result = decode_payload(payload).unwrap();
        assert!(result.contains("Hello from a rich document."));
    }
}
