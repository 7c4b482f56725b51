//! `cscribe replay`: feed a log file through the engine and print turns.
//!
//! Every session is finalized once the file is exhausted, standing in for
//! the idle-timeout / end-of-call signal a live ingestion loop would use.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use convoscribe_core::session::{InMemorySessionStore, IngestOutcome, SessionReconciler};
use convoscribe_types::config::EngineConfig;
use convoscribe_types::conversation::{SessionPhase, Turn};
use convoscribe_types::log::LogLine;
use serde::Serialize;

use super::preview;

/// Reconstructed conversation for one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTranscript {
    pub session_id: String,
    pub phase: SessionPhase,
    pub turns: Vec<Turn>,
}

/// Line routing counts for one replay.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ReplayStats {
    pub context_lines: usize,
    pub tts_lines: usize,
    pub ignored_lines: usize,
    pub skipped_records: usize,
}

/// Run `lines` through a fresh reconciler and finalize every session.
///
/// With `only`, every session is still ingested but only that one is
/// returned.
pub fn build_transcripts(
    lines: &[LogLine],
    config: EngineConfig,
    only: Option<&str>,
) -> (Vec<SessionTranscript>, ReplayStats) {
    let reconciler = SessionReconciler::new(InMemorySessionStore::new(), config);
    let mut stats = ReplayStats::default();

    for line in lines {
        match reconciler.ingest_line(line) {
            IngestOutcome::Context { .. } => stats.context_lines += 1,
            IngestOutcome::Tts { .. } => stats.tts_lines += 1,
            IngestOutcome::Ignored(reason) => {
                tracing::trace!(%reason, "Line ignored");
                stats.ignored_lines += 1;
            }
        }
    }

    let transcripts = reconciler
        .session_ids()
        .into_iter()
        .filter(|id| only.is_none_or(|wanted| id.as_str() == wanted))
        .map(|session_id| {
            let turns = reconciler.finalize(&session_id);
            let phase = reconciler.phase(&session_id).unwrap_or_default();
            SessionTranscript {
                session_id,
                phase,
                turns,
            }
        })
        .collect();

    (transcripts, stats)
}

pub async fn replay(file: &Path, config: EngineConfig, only: Option<&str>, json: bool) -> Result<()> {
    let batch = convoscribe_infra::source::read_log_lines(file)
        .await
        .with_context(|| format!("Failed to read log file {}", file.display()))?;

    let (transcripts, mut stats) = build_transcripts(&batch.lines, config, only);
    stats.skipped_records = batch.skipped;

    if json {
        let result = serde_json::json!({
            "sessions": transcripts,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if transcripts.is_empty() {
        println!();
        println!(
            "  {} No sessions reconstructed from {}.",
            style("i").blue().bold(),
            style(file.display()).cyan(),
        );
        print_stats(&stats);
        return Ok(());
    }

    for transcript in &transcripts {
        print_transcript(transcript);
    }
    print_stats(&stats);

    Ok(())
}

fn print_transcript(transcript: &SessionTranscript) {
    println!();
    println!(
        "  Session {} ({}, {} turns)",
        style(&transcript.session_id).cyan(),
        transcript.phase,
        transcript.turns.len(),
    );

    if transcript.turns.is_empty() {
        println!("     {}", style("no context observed").dim());
        return;
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Time").fg(Color::White),
        Cell::new("User").fg(Color::White),
        Cell::new("Assistant").fg(Color::White),
    ]);

    for turn in &transcript.turns {
        let reply = match &turn.assistant_message {
            Some(text) => Cell::new(preview(text, 80)),
            None => Cell::new("(no reply)").fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(turn.turn_id),
            Cell::new(turn.timestamp.format("%H:%M:%S").to_string()).fg(Color::DarkGrey),
            Cell::new(preview(&turn.user_message, 60)).fg(Color::Cyan),
            reply,
        ]);
    }

    println!("{table}");
}

fn print_stats(stats: &ReplayStats) {
    println!();
    println!(
        "  {} context, {} tts, {} ignored lines; {} unreadable records",
        stats.context_lines, stats.tts_lines, stats.ignored_lines, stats.skipped_records,
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    const A: &str = "3f2b8c1e-9a4d-4e6f-b7c8-0d1e2f3a4b5c";
    const B: &str = "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee";

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn lines() -> Vec<LogLine> {
        vec![
            LogLine::new(t(0), format!("{A} pipeline started")),
            LogLine::new(
                t(1),
                format!("{A} context [{{'role': 'user', 'content': 'What is the price of urea?'}}]"),
            ),
            LogLine::new(t(2), format!("{A} Generating TTS [Urea costs 266 rupees per bag.]")),
            LogLine::new(t(3), format!("{B} Generating TTS [Hello?]")),
        ]
    }

    #[test]
    fn test_build_transcripts_finalizes_all_sessions() {
        let (transcripts, stats) = build_transcripts(&lines(), EngineConfig::default(), None);

        assert_eq!(
            stats,
            ReplayStats {
                context_lines: 1,
                tts_lines: 2,
                ignored_lines: 1,
                skipped_records: 0,
            }
        );
        assert_eq!(transcripts.len(), 2);

        let a = &transcripts[0];
        assert_eq!(a.session_id, A);
        assert_eq!(a.phase, SessionPhase::Merged);
        assert_eq!(
            a.turns[0].assistant_message.as_deref(),
            Some("Urea costs 266 rupees per bag.")
        );

        let b = &transcripts[1];
        assert_eq!(b.phase, SessionPhase::Empty);
        assert!(b.turns.is_empty());
    }

    #[test]
    fn test_build_transcripts_filters_session() {
        let (transcripts, _) = build_transcripts(&lines(), EngineConfig::default(), Some(B));
        assert_eq!(transcripts.len(), 1);
        assert_eq!(transcripts[0].session_id, B);
    }

    #[test]
    fn test_transcript_serializes_turns() {
        let (transcripts, _) = build_transcripts(&lines(), EngineConfig::default(), Some(A));
        let json = serde_json::to_value(&transcripts[0]).unwrap();
        assert_eq!(json["phase"], "merged");
        assert_eq!(json["turns"][0]["turn_id"], 1);
    }
}
