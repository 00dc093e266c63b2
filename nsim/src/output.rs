//! Output formatting for shell commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use nsim_core::{Entry, NodeDetail, NodeInfo, WalkEntry};
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
///
/// Results go to `out`, errors to `err`.
pub struct OutputWriter<O: Write, E: Write> {
    format: OutputFormat,
    out: O,
    err: E,
}

impl OutputWriter<io::Stdout, io::Stderr> {
    /// Create an OutputWriter on the process's stdout and stderr.
    pub fn stdio(json: bool) -> Self {
        Self::new(json, io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> OutputWriter<O, E> {
    /// Create a new OutputWriter.
    pub fn new(json: bool, out: O, err: E) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            out,
            err,
        }
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Write output using the configured format.
    ///
    /// The `text_fn` closure is called only in text mode to generate the
    /// human-readable output.
    pub fn write<T: Serialize>(&mut self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(self.out, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(self.out, "{}", text)?;
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Write raw text (the prompt, echoed commands) in text mode only.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        if self.format == OutputFormat::Text {
            write!(self.out, "{}", text)?;
            self.out.flush()?;
        }
        Ok(())
    }

    /// Write an error message.
    ///
    /// In JSON mode, writes a JSON error object with success=false.
    /// In text mode, writes the error message directly.
    pub fn write_error(&mut self, error: &dyn std::fmt::Display, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: error.to_string(),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(self.err, "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(self.err, "Error: {}", error);
            }
        }
        let _ = self.err.flush();
    }

    /// Consume the writer and return its sinks.
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for a successful command.
#[derive(Debug, Serialize)]
pub struct CommandOutput<'a> {
    pub success: bool,
    pub result_code: u8,
    pub command: &'a str,
    #[serde(flatten)]
    pub data: &'a Outcome,
}

/// What a command produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// `ls`
    Listing { entries: Vec<Entry> },
    /// `tree`
    Tree { entries: Vec<WalkEntry> },
    /// `cat`
    Content {
        name: String,
        content: Option<String>,
    },
    /// `echo` without a file
    Echo { text: String },
    /// `pwd`
    Location { path: String },
    /// `cd`
    Changed { path: String },
    /// `stat`
    Info { info: NodeInfo },
    /// `rm`
    Removed { name: String, released: usize },
    /// `mv` into a directory
    Moved { name: String, into: String },
    /// `mv` as a rename
    Renamed { from: String, to: String },
    /// `cp`
    Copied { from: String, to: String },
    /// `mkdir`, `touch`
    Created { name: String },
    /// `echo` into a file
    Written { name: String, bytes: usize },
    /// `help`
    Help { commands: Vec<&'static str> },
    /// `exit`
    Exit,
}

impl Outcome {
    /// Human-readable rendering used in text mode.
    pub fn to_text(&self) -> String {
        match self {
            Outcome::Listing { entries } => entries.iter().map(|e| format_entry(e) + "\n").collect(),
            Outcome::Tree { entries } => entries
                .iter()
                .map(|w| format!("{}{}\n", "  ".repeat(w.depth - 1), format_entry(&w.entry)))
                .collect(),
            Outcome::Content { content, .. } => match content {
                Some(text) => format!("{}\n", text),
                None => "Empty file.\n".to_string(),
            },
            Outcome::Echo { text } => format!("{}\n", text),
            Outcome::Location { path } => format!("{}\n", path),
            Outcome::Info { info } => format_info(info),
            Outcome::Removed { name, .. } => format!("'{}' removed.\n", name),
            Outcome::Moved { name, into } => format!("'{}' moved to '{}'.\n", name, into),
            Outcome::Renamed { from, to } => format!("'{}' renamed to '{}'.\n", from, to),
            Outcome::Copied { from, to } => format!("'{}' copied to '{}'.\n", from, to),
            Outcome::Help { commands } => commands.iter().map(|c| format!("  {}\n", c)).collect(),
            Outcome::Created { .. }
            | Outcome::Changed { .. }
            | Outcome::Written { .. }
            | Outcome::Exit => String::new(),
        }
    }
}

fn format_entry(entry: &Entry) -> String {
    match entry {
        Entry::Directory { name } => format!("[Dir]  {}", name),
        Entry::File {
            name,
            size,
            kind,
            id,
            permission,
        } => format!(
            "[File] {} | size: {} | kind: {} | id: {} | permission: {}",
            name, size, kind, id, permission
        ),
    }
}

fn timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_info(info: &NodeInfo) -> String {
    let mut text = format!("Name: {}\nPath: {}\n", info.name, info.path);
    match &info.detail {
        NodeDetail::Directory { entries } => {
            text.push_str("Type: directory\n");
            text.push_str(&format!("Entries: {}\n", entries));
        }
        NodeDetail::File {
            size,
            kind,
            id,
            permission,
            created,
            modified,
            accessed,
            content_len,
        } => {
            text.push_str("Type: file\n");
            text.push_str(&format!("Size: {} bytes\n", size));
            text.push_str(&format!("Kind: {}\n", kind));
            text.push_str(&format!("Id: {}\n", id));
            text.push_str(&format!("Permission: {}\n", permission));
            text.push_str(&format!("Created: {}\n", timestamp(created)));
            text.push_str(&format!("Modified: {}\n", timestamp(modified)));
            text.push_str(&format!("Accessed: {}\n", timestamp(accessed)));
            match content_len {
                Some(len) => text.push_str(&format!("Content: {} bytes\n", len)),
                None => text.push_str("Content: empty\n"),
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsim_core::FileKind;

    fn writer(json: bool) -> OutputWriter<Vec<u8>, Vec<u8>> {
        OutputWriter::new(json, Vec::new(), Vec::new())
    }

    fn listing() -> Outcome {
        Outcome::Listing {
            entries: vec![
                Entry::Directory {
                    name: "docs".to_string(),
                },
                Entry::File {
                    name: "a.txt".to_string(),
                    size: 100,
                    kind: FileKind::Character,
                    id: 3,
                    permission: 644,
                },
            ],
        }
    }

    #[test]
    fn test_text_listing() {
        assert_eq!(
            listing().to_text(),
            "[Dir]  docs\n[File] a.txt | size: 100 | kind: character | id: 3 | permission: 644\n"
        );
    }

    #[test]
    fn test_text_mode_writes_text() {
        let mut w = writer(false);
        let outcome = listing();
        w.write(&outcome, || outcome.to_text()).unwrap();
        let (out, err) = w.into_inner();
        assert!(String::from_utf8(out).unwrap().starts_with("[Dir]  docs"));
        assert!(err.is_empty());
    }

    #[test]
    fn test_json_mode_writes_json() {
        let mut w = writer(true);
        let outcome = listing();
        let data = CommandOutput {
            success: true,
            result_code: 0,
            command: "ls",
            data: &outcome,
        };
        w.write(&data, || unreachable!()).unwrap();

        let (out, _) = w.into_inner();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["command"], "ls");
        assert_eq!(json["result"], "listing");
        assert_eq!(json["entries"][1]["name"], "a.txt");
    }

    #[test]
    fn test_errors_go_to_err() {
        let mut w = writer(false);
        w.write_error(&"boom", 2);
        let (out, err) = w.into_inner();
        assert!(out.is_empty());
        assert_eq!(String::from_utf8(err).unwrap(), "Error: boom\n");

        let mut w = writer(true);
        w.write_error(&"boom", 2);
        let (_, err) = w.into_inner();
        let json: serde_json::Value = serde_json::from_slice(&err).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["result_code"], 2);
    }

    #[test]
    fn test_raw_text_suppressed_in_json() {
        let mut w = writer(true);
        w.write_raw("cd root> ").unwrap();
        let (out, _) = w.into_inner();
        assert!(out.is_empty());
    }

    #[test]
    fn test_stat_text() {
        use chrono::TimeZone;

        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let outcome = Outcome::Info {
            info: NodeInfo {
                name: "a".to_string(),
                path: "/docs/a".to_string(),
                detail: NodeDetail::File {
                    size: 100,
                    kind: FileKind::Numeric,
                    id: 1,
                    permission: 644,
                    created: at,
                    modified: at,
                    accessed: at,
                    content_len: None,
                },
            },
        };

        let text = outcome.to_text();
        assert!(text.starts_with("Name: a\nPath: /docs/a\nType: file\n"));
        assert!(text.contains("Kind: numeric\n"));
        assert!(text.contains("Created: 2024-01-02T03:04:05Z\n"));
        assert!(text.ends_with("Content: empty\n"));
    }

    #[test]
    fn test_empty_content_marker() {
        let outcome = Outcome::Content {
            name: "a".to_string(),
            content: None,
        };
        assert_eq!(outcome.to_text(), "Empty file.\n");
    }
}
