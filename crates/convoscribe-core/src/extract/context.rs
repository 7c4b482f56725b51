//! Context-dump scanner.
//!
//! The conversation history arrives as a language object repr leaked into the
//! log verbatim: keys and values may be single- or double-quoted and escaping
//! is inconsistent, so it is not JSON and no general parser applies. The
//! scanner walks it with an explicit three-state machine:
//!
//! ```text
//! SeekRoleMarker --found--> SeekContentKey --found--> ScanContentValue
//!       ^                        |  no key before next role     |
//!       +------------------------+------------------------------+
//! ```
//!
//! A quote character only closes a value when a structural continuation
//! follows it, which keeps contractions inside natural text from ending the
//! value early. Malformed entries are skipped; they never stop the scan.

use convoscribe_types::message::{MessageRole, ParsedMessage};

/// Literal that introduces the conversation array.
pub const CONTEXT_MARKER: &str = "context [";

const USER_MARKER: &str = "'role': 'user'";
const ASSISTANT_MARKER: &str = "'role': 'assistant'";
const ROLE_KEY: &str = "'role':";
const CONTENT_KEY: &str = "'content':";

/// What may follow the closing quote of a content value.
const CONTINUATIONS: [&str; 4] = ["}", ", ", "}\n", "},"];

/// Characters stripped from the tail of an unterminated value.
const TRUNCATION_TAIL: &[char] = &[']', '}', '{', '\'', '"', ',', ' ', '\n', '\r', '\t'];

/// Parse the `context [...]` payload of `line` into ordered messages.
///
/// Returns an empty list when the marker is absent.
pub fn parse_context_log(line: &str) -> Vec<ParsedMessage> {
    match line.find(CONTEXT_MARKER) {
        Some(pos) => ContextScanner::new(&line[pos + CONTEXT_MARKER.len()..]).collect(),
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekRoleMarker,
    SeekContentKey {
        role: MessageRole,
    },
    ScanContentValue {
        role: MessageRole,
        quote: u8,
        value_start: usize,
    },
}

/// Iterator over the messages of a context array payload.
///
/// `input` is everything after the `context [` marker.
#[derive(Debug, Clone)]
pub struct ContextScanner<'a> {
    input: &'a str,
    cursor: usize,
    state: ScanState,
}

impl<'a> ContextScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            cursor: 0,
            state: ScanState::SeekRoleMarker,
        }
    }

    /// Closest user or assistant role marker at or after the cursor.
    fn next_role_marker(&self) -> Option<(MessageRole, usize, usize)> {
        let rest = &self.input[self.cursor..];
        let user = rest
            .find(USER_MARKER)
            .map(|i| (MessageRole::User, i, USER_MARKER.len()));
        let assistant = rest
            .find(ASSISTANT_MARKER)
            .map(|i| (MessageRole::Assistant, i, ASSISTANT_MARKER.len()));

        let (role, offset, len) = match (user, assistant) {
            (Some(u), Some(a)) => {
                if u.1 <= a.1 {
                    u
                } else {
                    a
                }
            }
            (Some(u), None) => u,
            (None, Some(a)) => a,
            (None, None) => return None,
        };
        Some((role, self.cursor + offset, len))
    }

    /// Locate the opening quote of this entry's content value.
    ///
    /// The search is bounded by the next `'role':` key so one entry can never
    /// borrow the content of the following one.
    fn find_value_start(&self) -> Option<(u8, usize)> {
        let rest = &self.input[self.cursor..];
        let bound = rest.find(ROLE_KEY).unwrap_or(rest.len());
        let key_end = rest[..bound].find(CONTENT_KEY)? + CONTENT_KEY.len();

        let after_key = &rest[key_end..bound];
        let single = after_key.find('\'');
        let double = after_key.find('"');
        let (quote, offset) = match (single, double) {
            (Some(s), Some(d)) if d < s => (b'"', d),
            (Some(s), _) => (b'\'', s),
            (None, Some(d)) => (b'"', d),
            (None, None) => return None,
        };
        Some((quote, self.cursor + key_end + offset + 1))
    }

    /// Furthest a value starting at `start` may extend: the next `'role':`
    /// key, or end of input.
    fn value_bound(&self, start: usize) -> usize {
        self.input[start..]
            .find(ROLE_KEY)
            .map_or(self.input.len(), |offset| start + offset)
    }

    /// Byte index of the quote that closes a value starting at `start`,
    /// searched no further than `bound`.
    ///
    /// Quote and backslash are ASCII, so byte-wise scanning never splits a
    /// multi-byte character.
    fn find_value_end(&self, start: usize, bound: usize, quote: u8) -> Option<usize> {
        let bytes = &self.input.as_bytes()[..bound];
        let mut escaped = false;
        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == quote {
                let tail = &self.input[i + 1..];
                if tail.is_empty() || CONTINUATIONS.iter().any(|c| tail.starts_with(c)) {
                    return Some(i);
                }
            }
        }
        None
    }
}

impl Iterator for ContextScanner<'_> {
    type Item = ParsedMessage;

    fn next(&mut self) -> Option<ParsedMessage> {
        loop {
            match self.state {
                ScanState::SeekRoleMarker => {
                    let (role, at, len) = self.next_role_marker()?;
                    self.cursor = at + len;
                    self.state = ScanState::SeekContentKey { role };
                }
                ScanState::SeekContentKey { role } => match self.find_value_start() {
                    Some((quote, value_start)) => {
                        self.state = ScanState::ScanContentValue {
                            role,
                            quote,
                            value_start,
                        };
                    }
                    None => {
                        // The cursor already sits past the role marker, so
                        // seeking again cannot find the same entry.
                        tracing::debug!(
                            role = %role,
                            offset = self.cursor,
                            "Role marker without content value; skipping entry"
                        );
                        self.state = ScanState::SeekRoleMarker;
                    }
                },
                ScanState::ScanContentValue {
                    role,
                    quote,
                    value_start,
                } => {
                    self.state = ScanState::SeekRoleMarker;
                    let bound = self.value_bound(value_start);
                    match self.find_value_end(value_start, bound, quote) {
                        Some(end) => {
                            self.cursor = end + 1;
                            let content = unescape(&self.input[value_start..end]);
                            return Some(ParsedMessage::new(role, content));
                        }
                        None => {
                            // Resume at the next entry so one broken value
                            // cannot swallow the rest of the array.
                            self.cursor = bound;
                            let partial =
                                self.input[value_start..bound].trim_end_matches(TRUNCATION_TAIL);
                            tracing::debug!(
                                role = %role,
                                partial_len = partial.len(),
                                "Unterminated content value; keeping partial text"
                            );
                            if partial.is_empty() {
                                continue;
                            }
                            return Some(ParsedMessage::new(role, unescape(partial)));
                        }
                    }
                }
            }
        }
    }
}

/// Undo the repr escapes that matter for conversational text.
///
/// Handles `\'`, `\"`, `\n` and `\\`; any other backslash sequence is kept
/// verbatim.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
