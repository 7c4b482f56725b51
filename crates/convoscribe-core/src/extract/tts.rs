//! Speech-synthesis log line extraction.

/// Literal that introduces the synthesized text.
pub const TTS_MARKER: &str = "Generating TTS [";

/// Return the bracketed text of a `Generating TTS [...]` line.
///
/// The text runs to the last `]` on the line; nested brackets are not
/// interpreted. Returns `None` when the marker or the closing bracket is
/// missing. Surrounding whitespace is trimmed.
pub fn parse_tts_log(line: &str) -> Option<String> {
    let start = line.find(TTS_MARKER)? + TTS_MARKER.len();
    let rest = &line[start..];
    let end = rest.rfind(']')?;
    Some(rest[..end].trim().to_owned())
}
