//! Pairs user and assistant messages into numbered turns.
//!
//! A user message opens a turn; an assistant message immediately after it is
//! that turn's reply. System messages and stray assistant messages open
//! nothing. Turn ids are assigned at emission time, so a turn dropped for an
//! empty (post-cleaning) user message never leaves a gap.

use chrono::{DateTime, Utc};
use convoscribe_types::conversation::{ContextSnapshot, Turn};
use convoscribe_types::message::{MessageRole, ParsedMessage};

use crate::extract::clean_user_message;

/// Build the turn list for a snapshot, stamping turns with its capture time.
pub fn assemble_snapshot(snapshot: &ContextSnapshot) -> Vec<Turn> {
    assemble_turns(&snapshot.turns, snapshot.captured_at)
}

/// Convert ordered messages into turns numbered from 1.
pub fn assemble_turns(messages: &[ParsedMessage], timestamp: DateTime<Utc>) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();
    let mut iter = messages.iter().peekable();

    while let Some(message) = iter.next() {
        if message.role != MessageRole::User {
            continue;
        }

        let user_message = clean_user_message(&message.content).trim().to_owned();
        // Consumed even when the turn is dropped, so it cannot open anything.
        let reply = iter.next_if(|next| next.role == MessageRole::Assistant);

        if user_message.is_empty() {
            tracing::trace!("Dropping turn with empty user message");
            continue;
        }

        let assistant_message = reply
            .map(|m| m.content.trim())
            .filter(|content| !content.is_empty())
            .map(str::to_owned);

        turns.push(Turn {
            turn_id: u32::try_from(turns.len() + 1).unwrap_or(u32::MAX),
            user_message,
            assistant_message,
            timestamp,
        });
    }

    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_pairs_user_with_following_assistant() {
        let messages = vec![
            ParsedMessage::system("You are a helpful assistant."),
            ParsedMessage::user("Tell me about your company."),
            ParsedMessage::assistant("Farm Vaidya is a team of agriculture experts..."),
            ParsedMessage::user("Who is the CEO?"),
        ];
        let turns = assemble_turns(&messages, at());

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].turn_id, 1);
        assert_eq!(turns[0].user_message, "Tell me about your company.");
        assert_eq!(
            turns[0].assistant_message.as_deref(),
            Some("Farm Vaidya is a team of agriculture experts...")
        );
        assert_eq!(turns[1].turn_id, 2);
        assert_eq!(turns[1].user_message, "Who is the CEO?");
        assert_eq!(turns[1].assistant_message, None);
        assert!(turns.iter().all(|t| t.timestamp == at()));
    }

    #[test]
    fn test_numbering_contiguous_across_system_and_stray_assistants() {
        let messages = vec![
            ParsedMessage::assistant("Namaste! How can I help?"),
            ParsedMessage::assistant("I can answer crop questions."),
            ParsedMessage::user("Hi"),
            ParsedMessage::system("reminder"),
            ParsedMessage::assistant("orphaned reply"),
            ParsedMessage::user("What about wheat?"),
            ParsedMessage::assistant("Wheat is sown in winter."),
            ParsedMessage::assistant("Anything else?"),
            ParsedMessage::user("No"),
        ];
        let turns = assemble_turns(&messages, at());

        let ids: Vec<u32> = turns.iter().map(|t| t.turn_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        // The system message broke adjacency, so turn 1 has no reply.
        assert_eq!(turns[0].assistant_message, None);
        assert_eq!(
            turns[1].assistant_message.as_deref(),
            Some("Wheat is sown in winter.")
        );
        assert_eq!(turns[2].user_message, "No");
    }

    #[test]
    fn test_empty_turns_are_dropped_without_gaps() {
        let messages = vec![
            ParsedMessage::user("   "),
            ParsedMessage::assistant("reply to nothing"),
            ParsedMessage::user("[KNOWLEDGE BASE CONTEXT]\n```json\n{}\n```\n"),
            ParsedMessage::user("Real question"),
            ParsedMessage::assistant("Real answer"),
        ];
        let turns = assemble_turns(&messages, at());

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].turn_id, 1);
        assert_eq!(turns[0].user_message, "Real question");
        assert_eq!(turns[0].assistant_message.as_deref(), Some("Real answer"));
    }

    #[test]
    fn test_user_message_is_cleaned() {
        let messages = vec![ParsedMessage::user(
            "[KNOWLEDGE BASE CONTEXT]\n```json\n{...}\n```\nWhat is the price of urea?",
        )];
        let turns = assemble_turns(&messages, at());
        assert_eq!(turns[0].user_message, "What is the price of urea?");
    }

    #[test]
    fn test_blank_assistant_reply_counts_as_missing() {
        let messages = vec![ParsedMessage::user("Hello"), ParsedMessage::assistant("  ")];
        let turns = assemble_turns(&messages, at());
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].assistant_message, None);
    }

    #[test]
    fn test_snapshot_uses_capture_time() {
        let snapshot = ContextSnapshot::new(vec![ParsedMessage::user("Hi")], at());
        let turns = assemble_snapshot(&snapshot);
        assert_eq!(turns[0].timestamp, at());
    }

    #[test]
    fn test_long_history_numbers_every_turn() {
        let messages: Vec<ParsedMessage> = (0..300)
            .flat_map(|i| {
                [
                    ParsedMessage::user(format!("question {i}")),
                    ParsedMessage::assistant(format!("answer {i}")),
                ]
            })
            .collect();
        let turns = assemble_turns(&messages, at());

        assert_eq!(turns.len(), 300);
        assert!(turns.iter().zip(1u32..).all(|(turn, id)| turn.turn_id == id));
        assert_eq!(turns[299].user_message, "question 299");
    }

    #[test]
    fn test_no_messages_no_turns() {
        assert!(assemble_turns(&[], at()).is_empty());
    }
}
