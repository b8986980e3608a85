//! Console log formatting
//!
//! Renders severity-tagged entries for terminals, with optional ANSI colors
//! and an aligned trace section for errors.

use crate::infrastructure::diagnostics::Severity;
use crate::infrastructure::truncate::{cut_front_path, cut_start};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::panic::Location;
use std::path::Path;
use time::macros::format_description;
use time::OffsetDateTime;

/// Messages longer than this use the multi-line layout
const MAX_MSG_WIDTH: usize = 100;
/// Width limit for file names and paths in the trace section
const TRACE_PATH_WIDTH: usize = 40;

const RESET: &str = "\x1b[0m";

/// ANSI text style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Bold,
    Italics,
    Underline,
    Red,
    Yellow,
    Green,
    Cyan,
    Blue,
    Magenta,
    DimGrey,
}

impl Style {
    fn code(&self) -> &'static str {
        match self {
            Style::Bold => "\x1b[1m",
            Style::Italics => "\x1b[3m",
            Style::Underline => "\x1b[4m",
            Style::Red => "\x1b[31m",
            Style::Yellow => "\x1b[33m",
            Style::Green => "\x1b[32m",
            Style::Cyan => "\x1b[36m",
            Style::Blue => "\x1b[34m",
            Style::Magenta => "\x1b[35m",
            Style::DimGrey => "\x1b[90m",
        }
    }
}

/// Wrap `text` in the given styles followed by a reset
pub fn colorize(text: &str, styles: &[Style]) -> String {
    let mut out = String::with_capacity(text.len() + styles.len() * 5 + RESET.len());
    for style in styles {
        out.push_str(style.code());
    }
    out.push_str(text);
    out.push_str(RESET);
    out
}

/// Strip ANSI escape sequences
pub fn decolorize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // Parameters run until the final byte of the sequence.
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn level_styles(level: Severity) -> &'static [Style] {
    match level {
        Severity::Critical => &[Style::Bold, Style::Magenta],
        Severity::Error => &[Style::Red],
        Severity::Warning => &[Style::Yellow],
        Severity::Info => &[Style::Green],
        Severity::Debug => &[Style::Cyan],
        Severity::Test => &[Style::Blue],
    }
}

fn write_styled(out: &mut String, colorized: bool, text: &str, styles: &[Style]) {
    if colorized {
        out.push_str(&colorize(text, styles));
    } else {
        out.push_str(text);
    }
}

fn pad(out: &mut String, width: usize, used: usize) {
    for _ in used..width {
        out.push(' ');
    }
    out.push(' ');
}

/// One caller location in an entry's trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceFrame {
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

impl TraceFrame {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            function: None,
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    fn label(&self) -> String {
        match &self.function {
            Some(function) => format!("{}()", cut_start(function, TRACE_PATH_WIDTH, "::", false)),
            None => {
                let name = Path::new(&self.file)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(&self.file);
                format!("{}()", cut_start(name, TRACE_PATH_WIDTH, ".", false))
            }
        }
    }
}

impl From<&Location<'_>> for TraceFrame {
    fn from(location: &Location<'_>) -> Self {
        TraceFrame::new(location.file(), location.line())
    }
}

/// A log entry ready for rendering
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: OffsetDateTime,
    pub level: Severity,
    pub message: String,
    pub trace: Vec<TraceFrame>,
}

#[derive(Serialize)]
struct JsonLogEntry<'a> {
    time: String,
    level: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "no_frames")]
    stacktrace: &'a [TraceFrame],
}

fn no_frames(frames: &&[TraceFrame]) -> bool {
    frames.is_empty()
}

impl LogEntry {
    /// Entry stamped now, traced to the calling location
    ///
    /// Records one frame. Deeper traces are built with [`LogEntry::with_frame`].
    #[track_caller]
    pub fn new(level: Severity, message: impl Into<String>) -> Self {
        Self {
            time: OffsetDateTime::now_utc(),
            level,
            message: message.into(),
            trace: vec![TraceFrame::from(Location::caller())],
        }
    }

    /// Entry stamped now, without trace frames
    pub fn untraced(level: Severity, message: impl Into<String>) -> Self {
        Self::at(OffsetDateTime::now_utc(), level, message)
    }

    /// Entry with an explicit timestamp and no trace frames
    pub fn at(time: OffsetDateTime, level: Severity, message: impl Into<String>) -> Self {
        Self {
            time,
            level,
            message: message.into(),
            trace: Vec::new(),
        }
    }

    pub fn with_frame(mut self, frame: TraceFrame) -> Self {
        self.trace.push(frame);
        self
    }

    fn timestamp(&self) -> String {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        self.time
            .format(&format)
            .unwrap_or_else(|_| self.time.unix_timestamp().to_string())
    }

    /// True when some text follows a newline in the message
    fn is_multi_line(&self) -> bool {
        self.message
            .split_once('\n')
            .map(|(_, rest)| rest.chars().any(|c| c != '\n'))
            .unwrap_or(false)
    }

    /// Render for a terminal
    ///
    /// `prefix` is printed before the severity inside the brackets.
    pub fn render(&self, prefix: &str, colorized: bool) -> String {
        let multi_line = self.is_multi_line();
        let timestamp = self.timestamp();
        let mut out = String::with_capacity(self.message.len() + 64);

        if multi_line || self.message.len() > MAX_MSG_WIDTH {
            out.push_str("[ ");
            if !prefix.is_empty() {
                write_styled(&mut out, colorized, prefix, &[Style::DimGrey]);
            }
            write_styled(&mut out, colorized, self.level.as_str(), level_styles(self.level));
            out.push_str(" ] - ");
            write_styled(&mut out, colorized, &timestamp, &[Style::DimGrey]);
        } else {
            write_styled(&mut out, colorized, &timestamp, &[Style::DimGrey, Style::Bold]);
            out.push_str(" [ ");
            if !prefix.is_empty() {
                write_styled(&mut out, colorized, prefix, &[Style::DimGrey]);
            }
            write_styled(&mut out, colorized, self.level.as_str(), level_styles(self.level));
            out.push_str(" ] - ");
        }

        if !self.message.is_empty() {
            if multi_line {
                out.push_str("\n\n");
            }
            out.push_str(&self.message);
        }

        if self.level > Severity::Error || self.trace.is_empty() {
            out.push('\n');
            return out;
        }

        out.push_str("\n\n");
        write_styled(&mut out, colorized, "Stacktrace:\n", &[Style::Red, Style::Underline]);

        let starts: Vec<String> = self
            .trace
            .iter()
            .map(|frame| format!("Error on line {}:", frame.line))
            .collect();
        let labels: Vec<String> = self.trace.iter().map(TraceFrame::label).collect();
        let start_width = starts.iter().map(String::len).max().unwrap_or(0);
        let label_width = labels.iter().map(String::len).max().unwrap_or(0);

        for ((frame, start), label) in self.trace.iter().zip(&starts).zip(&labels) {
            write_styled(&mut out, colorized, start, &[Style::Italics, Style::DimGrey]);
            pad(&mut out, start_width, start.len());
            write_styled(&mut out, colorized, label, &[Style::Italics, Style::Red]);
            pad(&mut out, label_width, label.len());
            write_styled(
                &mut out,
                colorized,
                &cut_front_path(&frame.file, TRACE_PATH_WIDTH),
                &[Style::Italics, Style::DimGrey],
            );
            out.push('\n');
        }

        let rule = out
            .split('\n')
            .map(|line| decolorize(line).chars().count())
            .max()
            .unwrap_or(0);
        out.push_str(&"-".repeat(rule));
        out.push('\n');
        out
    }

    /// One-line JSON form
    pub fn to_json(&self) -> String {
        let entry = JsonLogEntry {
            time: self.timestamp(),
            level: self.level.as_str(),
            message: &self.message,
            stacktrace: &self.trace,
        };
        serde_json::to_string(&entry).unwrap_or_else(|_| self.message.clone())
    }
}

/// Open a log file for appending, creating missing parent directories
pub fn open_log_file(path: impl AsRef<Path>) -> io::Result<File> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}
