use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// Decode bytes of unknown encoding into a well-formed string.
///
/// A byte-order mark wins, then strict UTF-8, then whatever `chardetng` guesses.
/// Undecodable sequences become U+FFFD instead of failing; the normalizer strips
/// them later.
pub fn safe_decode(byte_data: &[u8]) -> String {
    if byte_data.is_empty() {
        return String::new();
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(byte_data) {
        let (decoded, _) = encoding.decode_without_bom_handling(&byte_data[bom_len..]);
        return decoded.into_owned();
    }

    if let Ok(text) = std::str::from_utf8(byte_data) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(byte_data, true);
    let encoding = detector.guess(None, true);

    let (decoded, had_errors) = encoding.decode_without_bom_handling(byte_data);
    if had_errors && encoding != UTF_8 {
        let (lossy, _) = UTF_8.decode_without_bom_handling(byte_data);
        if replacement_count(&lossy) < replacement_count(&decoded) {
            return lossy.into_owned();
        }
    }
    decoded.into_owned()
}

fn replacement_count(text: &str) -> usize {
    text.chars().filter(|c| *c == char::REPLACEMENT_CHARACTER).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_decode_empty() {
        assert_eq!(safe_decode(b""), "");
    }

    #[test]
    fn test_safe_decode_ascii() {
        assert_eq!(safe_decode(b"Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_safe_decode_utf8() {
        assert_eq!(safe_decode("Grüße, 世界".as_bytes()), "Grüße, 世界");
    }

    #[test]
    fn test_safe_decode_strips_utf8_bom() {
        assert_eq!(safe_decode(b"\xEF\xBB\xBFhello"), "hello");
    }

    #[test]
    fn test_safe_decode_utf16_bom() {
        let bytes = [0xFF, 0xFE, b'h', 0, b'i', 0];
        assert_eq!(safe_decode(&bytes), "hi");
    }

    #[test]
    fn test_safe_decode_latin1() {
        let decoded = safe_decode(b"caf\xe9 cr\xe8me br\xfbl\xe9e");
        assert!(decoded.starts_with("caf"));
        assert!(!decoded.contains(char::REPLACEMENT_CHARACTER));
    }

    #[test]
    fn test_safe_decode_never_fails_on_garbage() {
        let garbage: Vec<u8> = (0..=255u8).cycle().take(2048).collect();
        let decoded = safe_decode(&garbage);
        assert!(!decoded.is_empty());
    }
}
