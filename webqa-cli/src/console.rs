//! Interactive question loop.
//!
//! Each answered question is appended to an in-process [`Timeline`], which
//! `:history` prints newest first. Nothing is persisted between sessions.
//! Clearing the index also clears the timeline.

use anyhow::Result;
use chrono::{DateTime, Local};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;
use webqa_rag::{AnswerRecord, RagError, RagPipeline};

use crate::render::render_answer;

const PROMPT: &str = "webqa> ";

const HELP: &str = "\
Type a question and press Enter.
  :history         list questions asked this session
  :clear-history   forget the questions asked this session
  :reset           delete the persisted index and the session history
  :help            show this message
  :quit            leave (Ctrl-D also works)";

/// One line of console input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand<'a> {
    Quit,
    Help,
    History,
    ClearHistory,
    Reset,
    Ask(&'a str),
}

impl<'a> ConsoleCommand<'a> {
    /// Parse a line; blank input yields `None`.
    pub fn parse(input: &'a str) -> Option<Self> {
        let input = input.trim();
        let command = match input {
            "" => return None,
            ":quit" | ":q" | ":exit" => Self::Quit,
            ":help" => Self::Help,
            ":history" => Self::History,
            ":clear-history" => Self::ClearHistory,
            ":reset" => Self::Reset,
            question => Self::Ask(question),
        };
        Some(command)
    }
}

/// One question asked during a console session.
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub asked_at: DateTime<Local>,
    pub question: String,
    pub record: AnswerRecord,
}

/// Questions and answers of the current session, oldest first.
#[derive(Debug, Default)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: impl Into<String>, record: AnswerRecord) {
        self.entries.push(TimelineEntry { asked_at: Local::now(), question: question.into(), record });
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// One line per entry, newest first.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .rev()
            .map(|entry| {
                let marker = if entry.record.is_degraded() { " (degraded)" } else { "" };
                format!(
                    "{}  {}{marker}  [{} sources]",
                    entry.asked_at.format("%H:%M:%S"),
                    entry.question,
                    entry.record.sources.len()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Read questions from the terminal until `:quit` or end of input.
pub async fn run(pipeline: &RagPipeline) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut timeline = Timeline::new();
    println!("{HELP}\n");

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let Some(command) = ConsoleCommand::parse(&line) else {
            continue;
        };
        let _ = editor.add_history_entry(line.trim());

        match execute(pipeline, &mut timeline, command).await {
            Some(output) => println!("{output}"),
            None => break,
        }
    }

    Ok(())
}

/// Carry out one command and return what to print, or `None` to end the session.
pub async fn execute(
    pipeline: &RagPipeline,
    timeline: &mut Timeline,
    command: ConsoleCommand<'_>,
) -> Option<String> {
    let output = match command {
        ConsoleCommand::Quit => return None,
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::History if timeline.is_empty() => "No questions yet.".to_string(),
        ConsoleCommand::History => timeline.render(),
        ConsoleCommand::ClearHistory => {
            timeline.clear();
            "History cleared.".to_string()
        }
        ConsoleCommand::Reset => match pipeline.reset_index().await {
            Ok(()) => {
                timeline.clear();
                "Index and history cleared. Run `webqa ingest <URL>...` to rebuild the index."
                    .to_string()
            }
            Err(e) => format!("Failed to clear the index: {e}"),
        },
        ConsoleCommand::Ask(question) => match pipeline.ask(question).await {
            Ok(record) => {
                let output = render_answer(&record);
                timeline.push(question, record);
                output
            }
            Err(RagError::NotIndexed) => {
                "Nothing is indexed yet. Run `webqa ingest <URL>...` first.".to_string()
            }
            Err(e) => {
                warn!(error = %e, "question failed");
                format!("Error: {e}")
            }
        },
    };
    Some(output)
}
