//! Terminal rendering of progress events.
//!
//! Determinate events draw a bar, indeterminate ones a spinner. A new stage
//! starts a new line so earlier stages stay visible. Everything goes to
//! stderr so stdout only carries the final summary.

use pdfmix::progress::{ProgressEvent, ProgressMode, ProgressSink};
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const BAR_WIDTH: usize = 30;
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Line state for the stage being drawn.
#[derive(Debug)]
struct Line {
    stage: Option<String>,
    start_time: Instant,
    spinner_frame: usize,
    dirty: bool,
}

/// Progress sink drawing on stderr.
#[derive(Debug)]
pub struct TerminalProgress {
    enabled: bool,
    line: Mutex<Line>,
}

impl TerminalProgress {
    /// Draw only if `wanted` and stderr is a terminal.
    pub fn new(wanted: bool) -> Self {
        Self {
            enabled: wanted && io::stderr().is_terminal(),
            line: Mutex::new(Line {
                stage: None,
                start_time: Instant::now(),
                spinner_frame: 0,
                dirty: false,
            }),
        }
    }

    /// End the current line, if one was drawn.
    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        if let Ok(mut line) = self.line.lock()
            && line.dirty
        {
            eprintln!();
            line.dirty = false;
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn emit(&self, event: ProgressEvent) {
        if !self.enabled {
            return;
        }
        let Ok(mut line) = self.line.lock() else {
            return;
        };

        if line.stage.as_deref() != Some(event.stage.as_str()) {
            if line.dirty {
                eprintln!();
            }
            line.stage = Some(event.stage.clone());
            line.start_time = Instant::now();
        }

        let frame = SPINNER_FRAMES[line.spinner_frame % SPINNER_FRAMES.len()];
        line.spinner_frame += 1;
        let text = render(&event, frame, line.start_time.elapsed());

        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[K{text}");
        let _ = stderr.flush();
        line.dirty = true;
    }
}

/// One progress line for `event`.
fn render(event: &ProgressEvent, spinner: &str, elapsed: Duration) -> String {
    let detail = event
        .filename
        .as_deref()
        .or(event.message.as_deref())
        .unwrap_or_default();

    let mut parts = match event.mode {
        ProgressMode::Determinate => {
            let percent = event.percent().unwrap_or(0) as usize;
            vec![
                event.stage.clone(),
                render_bar(event.current, event.total),
                format!("{percent}%"),
                format!("{}/{}", event.current, event.total),
            ]
        }
        ProgressMode::Indeterminate => vec![spinner.to_string(), event.stage.clone()],
    };
    parts.push(format_duration(elapsed));
    if !detail.is_empty() {
        parts.push(detail.to_string());
    }
    parts.join(" ")
}

fn render_bar(current: usize, total: usize) -> String {
    let filled = (BAR_WIDTH * current.min(total)) / total.max(1);
    let head = if filled > 0 && filled < BAR_WIDTH { ">" } else { "" };
    let body = if head.is_empty() { filled } else { filled - 1 };
    format!(
        "[{}{}{}]",
        "=".repeat(body),
        head,
        " ".repeat(BAR_WIDTH - filled)
    )
}

/// Format a duration as a human-readable string.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
