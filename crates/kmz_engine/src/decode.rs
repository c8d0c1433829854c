use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use kmz_logging::kmz_debug;

/// How far into a document the XML declaration is searched for.
const DECLARATION_WINDOW: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
    /// Malformed sequences were replaced with U+FFFD.
    pub lossy: bool,
}

/// Decode an archive entry to UTF-8.
///
/// Order: byte order mark, then the `encoding` of the XML declaration, then
/// detection over the whole entry. Malformed input never fails; the bad
/// sequences come out as replacement characters.
pub fn decode_text(bytes: &[u8]) -> DecodedText {
    if let Some((bom_encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, bom_encoding);
    }

    // A declaration readable as ASCII rules out UTF-16, hence output_encoding.
    if let Some(declared) = declared_encoding(bytes)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, declared.output_encoding());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(DECLARATION_WINDOW)];
    if !window.starts_with(b"<?xml") {
        return None;
    }
    let end = window.windows(2).position(|w| w == b"?>")?;
    let declaration = std::str::from_utf8(&window[..end]).ok()?;
    let after = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let after = after.trim_start().strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &after[1..];
    let close = value.find(quote)?;
    Some(value[..close].trim().to_string())
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedText {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        kmz_debug!("Replaced malformed {} sequences", enc.name());
    }
    DecodedText {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
        lossy: had_errors,
    }
}
