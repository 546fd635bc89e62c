//! Per-session shell lifecycle state machine.
//!
//! Tracks the command-boundary markers (prompt-start, prompt-end,
//! command-start, command-end) and working-directory reports decoded from a
//! session's output stream, and turns them into [`ShellEvent`]s.
//!
//! At most one command is in flight per session. Completed commands are kept
//! in a bounded history, oldest dropped first.

use crate::marker::{ShellMarker, parse_osc};
use crate::osc::OscScanner;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// A command that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    /// Per-session sequence number
    pub id: u64,
    /// Command line text, when the shell reported it (633;E)
    pub command: Option<String>,
    /// Working directory at prompt time
    pub cwd: Option<String>,
    /// Viewport line at prompt-start
    pub prompt_line: usize,
    /// Viewport line at command-start
    pub start_line: Option<usize>,
    /// Viewport line at command-end
    pub end_line: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    pub exit_code: Option<i32>,
}

impl CommandRecord {
    /// Wall-clock duration, when both ends were observed
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.started_at.map(|start| self.finished_at - start)
    }
}

/// Notification produced by [`ShellIntegration::process`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    /// The tracked working directory changed
    CwdChanged { cwd: String, host: Option<String> },
    /// A command began executing
    CommandStarted {
        id: u64,
        command: Option<String>,
        cwd: Option<String>,
        start_line: usize,
    },
    /// A command finished
    CommandCompleted(CommandRecord),
}

/// The command currently being assembled between prompt-start and command-end.
#[derive(Debug, Clone)]
struct CommandBuilder {
    id: u64,
    prompt_line: usize,
    prompt_end_line: Option<usize>,
    cwd: Option<String>,
    command: Option<String>,
    start_line: Option<usize>,
    started_at: Option<DateTime<Utc>>,
}

/// Read-only view of the in-flight command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightCommand {
    pub id: u64,
    pub prompt_line: usize,
    /// Viewport line at prompt-end, once the prompt finished drawing
    pub prompt_end_line: Option<usize>,
    pub command: Option<String>,
    /// `true` once command-start has been seen (output is running)
    pub running: bool,
}

/// Shell integration state for one session
#[derive(Debug)]
pub struct ShellIntegration {
    scanner: OscScanner,
    current: Option<CommandBuilder>,
    history: VecDeque<CommandRecord>,
    history_limit: usize,
    cwd: Option<String>,
    host: Option<String>,
    last_exit_code: Option<i32>,
    next_command_id: u64,
}

impl ShellIntegration {
    /// Create an empty tracker keeping at most `history_limit` completed commands.
    pub fn new(history_limit: usize) -> Self {
        Self {
            scanner: OscScanner::new(),
            current: None,
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
            cwd: None,
            host: None,
            last_exit_code: None,
            next_command_id: 1,
        }
    }

    /// Seed the tracked directory (e.g. the directory the session was spawned in).
    pub fn set_initial_cwd(&mut self, cwd: impl Into<String>) {
        self.cwd = Some(cwd.into());
    }

    /// Last reported working directory
    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    /// Host of the last working-directory report, if it named a remote machine
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Exit code reported by the most recent command-end marker, `None` if
    /// that marker carried no status
    pub fn last_exit_code(&self) -> Option<i32> {
        self.last_exit_code
    }

    /// Completed commands, oldest first
    pub fn history(&self) -> impl Iterator<Item = &CommandRecord> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The command between prompt-start and command-end, if any
    pub fn current_command(&self) -> Option<InFlightCommand> {
        self.current.as_ref().map(|b| InFlightCommand {
            id: b.id,
            prompt_line: b.prompt_line,
            prompt_end_line: b.prompt_end_line,
            command: b.command.clone(),
            running: b.start_line.is_some(),
        })
    }

    /// Forget the in-flight command and any partial escape sequence.
    ///
    /// History, cwd and last exit code survive; they describe completed state.
    pub fn reset(&mut self) {
        self.scanner.reset();
        self.current = None;
    }

    /// Scan a chunk of raw output, stamping every marker with `cursor_line`.
    ///
    /// For callers that do not render the chunk themselves. Use
    /// [`process_with`](Self::process_with) to get per-marker line numbers.
    pub fn process(&mut self, data: &[u8], cursor_line: usize) -> Vec<ShellEvent> {
        self.process_with(data, |_| cursor_line)
    }

    /// Scan a chunk of raw output while it is being rendered.
    ///
    /// `render` is handed consecutive slices of `data`, split just after each
    /// OSC terminator, and returns the cursor line once the slice is applied.
    /// Every marker is stamped with the line returned for the slice it ends,
    /// so a command that starts, prints and finishes inside one chunk still
    /// records distinct start and end lines. Every byte of `data` is passed
    /// to `render` exactly once, in order.
    pub fn process_with(
        &mut self,
        data: &[u8],
        mut render: impl FnMut(&[u8]) -> usize,
    ) -> Vec<ShellEvent> {
        let mut events = Vec::new();
        let mut rendered = 0;

        for (end, payload) in self.scanner.feed_indexed(data) {
            let line = render(&data[rendered..end]);
            rendered = end;
            match parse_osc(&payload) {
                Some(marker) => self.apply_marker(marker, line, &mut events),
                None => log::trace!(
                    "Ignoring OSC payload: {:?}",
                    String::from_utf8_lossy(&payload)
                ),
            }
        }
        if rendered < data.len() {
            render(&data[rendered..]);
        }
        events
    }

    /// Apply one decoded marker, appending any resulting events.
    pub fn apply_marker(&mut self, marker: ShellMarker, line: usize, events: &mut Vec<ShellEvent>) {
        match marker {
            ShellMarker::PromptStart => {
                if let Some(abandoned) = self.current.take() {
                    log::debug!(
                        "Prompt started while command {} was still open, discarding it",
                        abandoned.id
                    );
                }
                self.current = Some(self.new_builder(line));
            }
            ShellMarker::PromptEnd => {
                if let Some(builder) = self.current.as_mut() {
                    builder.prompt_end_line = Some(line);
                }
            }
            ShellMarker::CommandLine(text) => {
                if let Some(builder) = self.current.as_mut() {
                    builder.command = Some(text);
                }
            }
            ShellMarker::CommandStart => {
                // Some shells only emit C/D; open a builder implicitly
                if self.current.is_none() {
                    self.current = Some(self.new_builder(line));
                }
                if let Some(builder) = self.current.as_mut() {
                    builder.start_line = Some(line);
                    builder.started_at = Some(Utc::now());
                    events.push(ShellEvent::CommandStarted {
                        id: builder.id,
                        command: builder.command.clone(),
                        cwd: builder.cwd.clone(),
                        start_line: line,
                    });
                }
            }
            ShellMarker::CommandEnd { exit_code } => {
                // A completion without a status must not keep showing the previous one
                self.last_exit_code = exit_code;
                let Some(builder) = self.current.take() else {
                    log::trace!("Command end without an open command (exit={:?})", exit_code);
                    return;
                };
                let record = CommandRecord {
                    id: builder.id,
                    command: builder.command,
                    cwd: builder.cwd,
                    prompt_line: builder.prompt_line,
                    start_line: builder.start_line,
                    end_line: line,
                    started_at: builder.started_at,
                    finished_at: Utc::now(),
                    exit_code,
                };
                self.history.push_back(record.clone());
                while self.history.len() > self.history_limit {
                    self.history.pop_front();
                }
                events.push(ShellEvent::CommandCompleted(record));
            }
            ShellMarker::WorkingDirectory { path, host } => {
                if self.cwd.as_deref() == Some(path.as_str()) && self.host == host {
                    return;
                }
                self.cwd = Some(path.clone());
                self.host = host.clone();
                events.push(ShellEvent::CwdChanged { cwd: path, host });
            }
        }
    }

    fn new_builder(&mut self, line: usize) -> CommandBuilder {
        let id = self.next_command_id;
        self.next_command_id += 1;
        CommandBuilder {
            id,
            prompt_line: line,
            prompt_end_line: None,
            cwd: self.cwd.clone(),
            command: None,
            start_line: None,
            started_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(events: &[ShellEvent]) -> Vec<&CommandRecord> {
        events
            .iter()
            .filter_map(|e| match e {
                ShellEvent::CommandCompleted(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_full_command_cycle() {
        let mut shell = ShellIntegration::new(10);
        let events = shell.process(
            b"\x1b]133;A\x07$ \x1b]133;B\x07false\r\n\x1b]133;C\x07\x1b]133;D;1\x07",
            4,
        );

        let started = events
            .iter()
            .filter(|e| matches!(e, ShellEvent::CommandStarted { .. }))
            .count();
        assert_eq!(started, 1);

        let done = completed(&events);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].exit_code, Some(1));
        assert_eq!(done[0].prompt_line, 4);
        assert_eq!(shell.last_exit_code(), Some(1));
        assert!(shell.current_command().is_none());
        assert_eq!(shell.history_len(), 1);
    }

    #[test]
    fn test_cycle_split_across_chunks() {
        let mut shell = ShellIntegration::new(10);
        let mut events = shell.process(b"\x1b]133;A\x07\x1b]13", 0);
        events.extend(shell.process(b"3;B\x07\x1b]133;C\x07out\n", 1));
        assert!(shell.current_command().is_some_and(|c| c.running));
        events.extend(shell.process(b"\x1b]133;D;0\x1b\\", 3));

        let done = completed(&events);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].start_line, Some(1));
        assert_eq!(done[0].end_line, 3);
        assert_eq!(done[0].exit_code, Some(0));
    }

    #[test]
    fn test_command_end_without_builder_updates_exit_code() {
        let mut shell = ShellIntegration::new(10);
        let events = shell.process(b"\x1b]133;D;127\x07", 0);
        assert!(events.is_empty());
        assert_eq!(shell.last_exit_code(), Some(127));
        assert_eq!(shell.history_len(), 0);
    }

    #[test]
    fn test_command_end_without_status_clears_exit_code() {
        let mut shell = ShellIntegration::new(10);
        shell.process(b"\x1b]133;C\x07\x1b]133;D;2\x07", 0);
        assert_eq!(shell.last_exit_code(), Some(2));

        let events = shell.process(b"\x1b]133;C\x07\x1b]133;D\x07", 0);
        assert_eq!(completed(&events)[0].exit_code, None);
        assert_eq!(shell.last_exit_code(), None);
    }

    #[test]
    fn test_single_chunk_command_gets_distinct_lines() {
        let mut shell = ShellIntegration::new(10);
        let data = b"\x1b]133;A\x07$ \x1b]133;B\x07ls\r\n\x1b]133;C\x07a\nb\nc\n\x1b]133;D;0\x07$ ";

        let mut rendered = Vec::new();
        let mut line = 0;
        let events = shell.process_with(data, |bytes| {
            rendered.extend_from_slice(bytes);
            line += bytes.iter().filter(|b| **b == b'\n').count();
            line
        });

        assert_eq!(rendered, data.to_vec());
        let done = completed(&events);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].prompt_line, 0);
        assert_eq!(done[0].start_line, Some(1));
        assert_eq!(done[0].end_line, 4);
        assert!(done[0].end_line > done[0].start_line.unwrap_or_default());
    }

    #[test]
    fn test_process_with_renders_chunks_without_markers() {
        let mut shell = ShellIntegration::new(10);
        let mut calls = Vec::new();
        let events = shell.process_with(b"plain output\n", |bytes| {
            calls.push(bytes.to_vec());
            1
        });
        assert!(events.is_empty());
        assert_eq!(calls, vec![b"plain output\n".to_vec()]);
    }

    #[test]
    fn test_command_start_opens_builder_implicitly() {
        let mut shell = ShellIntegration::new(10);
        let events = shell.process(b"\x1b]133;C\x07\x1b]133;D;0\x07", 2);
        assert_eq!(events.len(), 2);
        assert_eq!(completed(&events)[0].prompt_line, 2);
    }

    #[test]
    fn test_builder_captures_cwd_and_command_text() {
        let mut shell = ShellIntegration::new(10);
        shell.set_initial_cwd("/home/user");
        let events = shell.process(
            b"\x1b]633;A\x07\x1b]633;B\x07\x1b]633;E;cargo test\x07\x1b]633;C\x07\x1b]633;D;0\x07",
            0,
        );
        match &events[0] {
            ShellEvent::CommandStarted { command, cwd, .. } => {
                assert_eq!(command.as_deref(), Some("cargo test"));
                assert_eq!(cwd.as_deref(), Some("/home/user"));
            }
            other => panic!("expected CommandStarted, got {:?}", other),
        }
        assert_eq!(completed(&events)[0].command.as_deref(), Some("cargo test"));
    }

    #[test]
    fn test_cwd_changes_are_deduplicated() {
        let mut shell = ShellIntegration::new(10);
        let events = shell.process(b"\x1b]7;file:///tmp\x07\x1b]7;file:///tmp\x07", 0);
        assert_eq!(
            events,
            vec![ShellEvent::CwdChanged {
                cwd: "/tmp".to_string(),
                host: None
            }]
        );
        assert_eq!(shell.cwd(), Some("/tmp"));

        let events = shell.process(b"\x1b]7;file:///var\x07", 0);
        assert_eq!(events.len(), 1);
        assert_eq!(shell.cwd(), Some("/var"));
    }

    #[test]
    fn test_malformed_cwd_dropped_silently() {
        let mut shell = ShellIntegration::new(10);
        shell.set_initial_cwd("/home/user");
        let events = shell.process(b"\x1b]7;::garbage::\x07", 0);
        assert!(events.is_empty());
        assert_eq!(shell.cwd(), Some("/home/user"));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut shell = ShellIntegration::new(2);
        for code in 0..5 {
            let chunk = format!("\x1b]133;A\x07\x1b]133;C\x07\x1b]133;D;{code}\x07");
            shell.process(chunk.as_bytes(), 0);
        }
        let codes: Vec<_> = shell.history().map(|r| r.exit_code).collect();
        assert_eq!(codes, vec![Some(3), Some(4)]);
    }

    #[test]
    fn test_prompt_start_discards_open_command() {
        let mut shell = ShellIntegration::new(10);
        shell.process(b"\x1b]133;A\x07", 0);
        let first = shell.current_command().map(|c| c.id);
        shell.process(b"\x1b]133;A\x07", 1);
        let second = shell.current_command().map(|c| c.id);
        assert_ne!(first, second);
        assert_eq!(shell.history_len(), 0);
    }
}
