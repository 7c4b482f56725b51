//! `cscribe inspect`: show what the engine extracts from one raw line.

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use convoscribe_core::conversation::assemble_turns;
use convoscribe_core::extract::{
    classify_line, clean_with_tier, extract_session_id, parse_context_log, parse_tts_log,
};
use convoscribe_types::conversation::Turn;
use convoscribe_types::log::LineKind;
use convoscribe_types::message::{MessageRole, ParsedMessage};
use serde::Serialize;

use super::preview;

/// A parsed user message and the cleaning rule applied to it.
#[derive(Debug, Clone, Serialize)]
pub struct CleanedMessage {
    pub cleaned: String,
    pub tier: String,
}

/// Everything extracted from a single line.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub session_id: Option<String>,
    pub kind: LineKind,
    pub messages: Vec<ParsedMessage>,
    pub cleaned: Vec<CleanedMessage>,
    pub turns: Vec<Turn>,
    pub tts_text: Option<String>,
}

pub fn build_report(line: &str) -> InspectReport {
    let kind = classify_line(line);
    let mut report = InspectReport {
        session_id: extract_session_id(line),
        kind,
        messages: Vec::new(),
        cleaned: Vec::new(),
        turns: Vec::new(),
        tts_text: None,
    };

    match kind {
        LineKind::Context => {
            let messages = parse_context_log(line);
            report.cleaned = messages
                .iter()
                .filter(|m| m.role == MessageRole::User)
                .map(|m| {
                    let (cleaned, tier) = clean_with_tier(&m.content);
                    CleanedMessage {
                        cleaned,
                        tier: tier.to_string(),
                    }
                })
                .collect();
            report.turns = assemble_turns(&messages, Utc::now());
            report.messages = messages;
        }
        LineKind::Tts => report.tts_text = parse_tts_log(line),
        LineKind::Other => {}
    }

    report
}

pub fn inspect(line: &str, json: bool) -> Result<()> {
    let report = build_report(line);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "  Session: {}",
        match &report.session_id {
            Some(id) => style(id.as_str()).cyan().to_string(),
            None => style("none").dim().to_string(),
        }
    );
    println!("  Kind:    {}", style(report.kind).bold());

    match report.kind {
        LineKind::Context => print_context(&report),
        LineKind::Tts => match &report.tts_text {
            Some(text) => println!("  Speech:  {}", style(text).green()),
            None => println!("  Speech:  {}", style("unterminated payload").yellow()),
        },
        LineKind::Other => {
            println!("     {}", style("nothing the engine would ingest").dim());
        }
    }
    println!();

    Ok(())
}

fn print_context(report: &InspectReport) {
    if report.messages.is_empty() {
        println!("     {}", style("no messages recovered").yellow());
        return;
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Role").fg(Color::White),
        Cell::new("Content").fg(Color::White),
    ]);
    for message in &report.messages {
        let role = match message.role {
            MessageRole::User => Cell::new(message.role).fg(Color::Cyan),
            _ => Cell::new(message.role).fg(Color::Green),
        };
        table.add_row(vec![role, Cell::new(preview(&message.content, 100))]);
    }
    println!("{table}");

    for cleaned in &report.cleaned {
        println!(
            "  Cleaned ({}): {}",
            style(&cleaned.tier).dim(),
            preview(&cleaned.cleaned, 100),
        );
    }
    println!("  Turns:   {}", report.turns.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    const SID: &str = "3f2b8c1e-9a4d-4e6f-b7c8-0d1e2f3a4b5c";

    #[test]
    fn test_context_line_report() {
        let line = format!(
            "{SID} context [{{'role': 'user', 'content': 'Hi'}}, {{'role': 'assistant', 'content': 'Hello!'}}]"
        );
        let report = build_report(&line);

        assert_eq!(report.session_id.as_deref(), Some(SID));
        assert_eq!(report.kind, LineKind::Context);
        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.cleaned.len(), 1);
        assert_eq!(report.cleaned[0].tier, "untouched");
        assert_eq!(report.turns.len(), 1);
        assert_eq!(report.turns[0].assistant_message.as_deref(), Some("Hello!"));
        assert!(report.tts_text.is_none());
    }

    #[test]
    fn test_tts_line_report() {
        let report = build_report("Generating TTS [Urea costs 266 rupees.]");
        assert!(report.session_id.is_none());
        assert_eq!(report.kind, LineKind::Tts);
        assert_eq!(report.tts_text.as_deref(), Some("Urea costs 266 rupees."));
        assert!(report.messages.is_empty());
    }

    #[test]
    fn test_other_line_report_serializes() {
        let report = build_report("pipeline started");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "other");
        assert!(json["session_id"].is_null());
    }
}
