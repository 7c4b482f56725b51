//! Line-level extraction: session ids, context dumps, TTS payloads, and
//! user-message cleaning. Every function here is pure and total.

pub mod cleaner;
pub mod context;
pub mod session_id;
pub mod tts;

pub use cleaner::{CleanTier, clean_user_message, clean_with_tier};
pub use context::parse_context_log;
pub use session_id::extract_session_id;
pub use tts::parse_tts_log;

use convoscribe_types::log::LineKind;

/// Classify a raw line by the payload it carries.
///
/// The TTS marker is checked first: spoken text may quote `context [`,
/// while context dumps never carry the TTS marker.
pub fn classify_line(line: &str) -> LineKind {
    if line.contains(tts::TTS_MARKER) {
        LineKind::Tts
    } else if line.contains(context::CONTEXT_MARKER) {
        LineKind::Context
    } else {
        LineKind::Other
    }
}
