//! CLI output formatting.
//!
//! One line per walked entry, led by a fixed-width verb:
//!
//! ```text
//! MKDIR  notes
//! RENDER index.html (4 expressions)
//! COPY   assets/site.css
//! SKIP   about.html
//! FAIL   notes/broken.html: Permission denied (os error 13)
//! ```
//!
//! followed by a one-line summary:
//!
//! ```text
//! Done: 2 rendered, 3 copied, 0 skipped (5 files, 2 directories)
//! ```
//!
//! # Verbosity
//!
//! | Level | Shows |
//! |---|---|
//! | normal | everything |
//! | `--quiet` | RENDER, COPY, FAIL |
//! | `--quieter` | FAIL only |
//!
//! The summary is always printed. Verbosity never changes what a run does.
//!
//! Format functions are pure (plain text, no I/O) for testability; the
//! `print_*` wrappers add color and write to the terminal.

use crate::pipeline::{PipelineEvent, RunStats};
use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    #[default]
    Normal,
    Quiet,
    Quieter,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, quieter: bool) -> Self {
        if quieter {
            Self::Quieter
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    /// Whether `event` gets a line at this level.
    pub fn shows(self, event: &PipelineEvent) -> bool {
        match event {
            PipelineEvent::Failed { .. } => true,
            PipelineEvent::Rendered { .. } | PipelineEvent::Copied { .. } => {
                self <= Verbosity::Quiet
            }
            PipelineEvent::DirectoryCreated { .. } | PipelineEvent::Skipped { .. } => {
                self == Verbosity::Normal
            }
        }
    }
}

/// Verb and detail text for an event.
fn event_parts(event: &PipelineEvent) -> (&'static str, String) {
    match event {
        PipelineEvent::DirectoryCreated { path } => ("MKDIR", path.display().to_string()),
        PipelineEvent::Rendered { path, expressions } => {
            let noun = if *expressions == 1 {
                "expression"
            } else {
                "expressions"
            };
            ("RENDER", format!("{} ({} {})", path.display(), expressions, noun))
        }
        PipelineEvent::Copied { path } => ("COPY", path.display().to_string()),
        PipelineEvent::Skipped { path } => ("SKIP", path.display().to_string()),
        PipelineEvent::Failed { path, error } => ("FAIL", format!("{}: {}", path.display(), error)),
    }
}

/// Plain line for `event`, or `None` when hidden at this verbosity.
pub fn format_event(event: &PipelineEvent, verbosity: Verbosity) -> Option<String> {
    if !verbosity.shows(event) {
        return None;
    }
    let (verb, detail) = event_parts(event);
    Some(format!("{:<6} {}", verb, detail))
}

pub fn format_summary(stats: &RunStats) -> String {
    format!("Done: {}", stats)
}

/// Print an event line with a colored verb. Failures go to stderr.
pub fn print_event(event: &PipelineEvent, verbosity: Verbosity) {
    if !verbosity.shows(event) {
        return;
    }
    let (verb, detail) = event_parts(event);
    let verb = format!("{:<6}", verb);
    match event {
        PipelineEvent::DirectoryCreated { .. } => println!("{} {}", verb.blue(), detail),
        PipelineEvent::Rendered { .. } => println!("{} {}", verb.green(), detail),
        PipelineEvent::Copied { .. } => println!("{} {}", verb.cyan(), detail),
        PipelineEvent::Skipped { .. } => println!("{} {}", verb.dimmed(), detail),
        PipelineEvent::Failed { .. } => eprintln!("{} {}", verb.red(), detail),
    }
}

pub fn print_summary(stats: &RunStats) {
    let line = format_summary(stats);
    if stats.failed > 0 {
        println!("{}", line.yellow());
    } else {
        println!("{}", line);
    }
}
