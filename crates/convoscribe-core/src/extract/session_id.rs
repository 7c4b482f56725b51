//! Session correlation id extraction.

use std::sync::OnceLock;

use regex::Regex;

fn session_id_re() -> &'static Regex {
    static SESSION_ID_RE: OnceLock<Regex> = OnceLock::new();
    SESSION_ID_RE.get_or_init(|| {
        Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .expect("valid session id regex")
    })
}

/// Return the first 8-4-4-4-12 hexadecimal UUID found in `line`, if any.
///
/// Matching is case-insensitive and the id is returned exactly as it appears.
pub fn extract_session_id(line: &str) -> Option<String> {
    session_id_re().find(line).map(|m| m.as_str().to_owned())
}
