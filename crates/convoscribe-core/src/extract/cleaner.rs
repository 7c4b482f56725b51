//! Knowledge-base injection stripping for user messages.
//!
//! Retrieval-augmented context is prepended to the user's turn upstream,
//! tagged with `[KNOWLEDGE BASE CONTEXT]` and usually carried in a fenced
//! `json` block. Removal is tiered; the first tier that clears the marker
//! wins:
//!
//! 1. Strip marker through the closing fence of a ```` ```json ```` block.
//! 2. Same, for fences whose backticks were escaped upstream (`` \`\`\` ``).
//! 3. Keep only the last non-empty line that is not fence or separator noise.

use std::sync::OnceLock;

use regex::Regex;

/// Tag that marks an injected retrieval block.
pub const KNOWLEDGE_BASE_MARKER: &str = "[KNOWLEDGE BASE CONTEXT]";

/// Tokens that disqualify a line from being the user's real question.
const NOISE_TOKENS: [&str; 5] = ["```", r"\`\`\`", "---", "===", KNOWLEDGE_BASE_MARKER];

fn fenced_block_re() -> &'static Regex {
    static FENCED_BLOCK_RE: OnceLock<Regex> = OnceLock::new();
    FENCED_BLOCK_RE.get_or_init(|| {
        Regex::new(r"(?s)\[KNOWLEDGE BASE CONTEXT\].*?```json.*?```\s*")
            .expect("valid fenced block regex")
    })
}

fn escaped_fence_block_re() -> &'static Regex {
    static ESCAPED_FENCE_BLOCK_RE: OnceLock<Regex> = OnceLock::new();
    ESCAPED_FENCE_BLOCK_RE.get_or_init(|| {
        Regex::new(r"(?s)\[KNOWLEDGE BASE CONTEXT\].*?\\`\\`\\`json.*?\\`\\`\\`\s*")
            .expect("valid escaped fence block regex")
    })
}

/// Which removal rule produced a cleaned message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanTier {
    /// No marker present; message returned unchanged.
    Untouched,
    FencedBlock,
    EscapedFenceBlock,
    LastLine,
}

impl std::fmt::Display for CleanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Untouched => write!(f, "untouched"),
            Self::FencedBlock => write!(f, "fenced_block"),
            Self::EscapedFenceBlock => write!(f, "escaped_fence_block"),
            Self::LastLine => write!(f, "last_line"),
        }
    }
}

/// Strip knowledge-base injection noise from a user message.
///
/// Identity for messages without the marker; otherwise the result is trimmed.
pub fn clean_user_message(message: &str) -> String {
    clean_with_tier(message).0
}

/// Like [`clean_user_message`], also reporting which tier applied.
pub fn clean_with_tier(message: &str) -> (String, CleanTier) {
    if !message.contains(KNOWLEDGE_BASE_MARKER) {
        return (message.to_owned(), CleanTier::Untouched);
    }

    let cleaned = fenced_block_re().replace_all(message, "");
    if !cleaned.contains(KNOWLEDGE_BASE_MARKER) {
        return (cleaned.trim().to_owned(), CleanTier::FencedBlock);
    }

    let cleaned = escaped_fence_block_re().replace_all(&cleaned, "");
    if !cleaned.contains(KNOWLEDGE_BASE_MARKER) {
        return (cleaned.trim().to_owned(), CleanTier::EscapedFenceBlock);
    }

    let question = cleaned
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty() && !NOISE_TOKENS.iter().any(|t| line.contains(t)))
        .unwrap_or_default();
    tracing::debug!(
        found = !question.is_empty(),
        "Knowledge base block had no recognizable fence; fell back to last line"
    );
    (question.to_owned(), CleanTier::LastLine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_without_marker() {
        for msg in ["", "  padded  ", "What is the price of urea?", "```json\n{}\n```"] {
            assert_eq!(clean_user_message(msg), msg);
        }
    }

    #[test]
    fn test_strips_fenced_json_block() {
        let msg = "[KNOWLEDGE BASE CONTEXT]\n```json\n{...}\n```\nWhat is the price of urea?";
        assert_eq!(
            clean_with_tier(msg),
            ("What is the price of urea?".to_string(), CleanTier::FencedBlock)
        );
    }

    #[test]
    fn test_keeps_text_before_marker() {
        let msg = "Hello.\n[KNOWLEDGE BASE CONTEXT]\n```json\n{\"crop\": \"rice\"}\n```\nWhen to sow?";
        assert_eq!(clean_user_message(msg), "Hello.\nWhen to sow?");
    }

    #[test]
    fn test_strips_escaped_fence_block() {
        let msg = r"[KNOWLEDGE BASE CONTEXT]
\`\`\`json
{}
\`\`\`
How much water does paddy need?";
        assert_eq!(
            clean_with_tier(msg),
            (
                "How much water does paddy need?".to_string(),
                CleanTier::EscapedFenceBlock
            )
        );
    }

    #[test]
    fn test_falls_back_to_last_clean_line() {
        let msg = "[KNOWLEDGE BASE CONTEXT]\nsource: faq.pdf\n---\nIs neem oil safe?\n\n```";
        assert_eq!(
            clean_with_tier(msg),
            ("Is neem oil safe?".to_string(), CleanTier::LastLine)
        );
    }

    #[test]
    fn test_fallback_with_only_noise_is_empty() {
        let msg = "[KNOWLEDGE BASE CONTEXT]\n```\n---";
        assert_eq!(clean_user_message(msg), "");
    }
}
