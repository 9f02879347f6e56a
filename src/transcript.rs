//! Bounded console output and command history.

use std::collections::VecDeque;

/// The console's scrollback: the most recent `capacity` lines, oldest first.
///
/// Each line is stamped with a sequence number so a follower can pick up only
/// what was appended since it last looked, even across evictions and clears.
#[derive(Debug)]
pub struct OutputBuffer {
    lines: VecDeque<(u64, String)>,
    capacity: usize,
    next_seq: u64,
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push_back((self.next_seq, line.into()));
        self.next_seq += 1;
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All buffered lines joined with `\n`.
    pub fn joined(&self) -> String {
        let lines: Vec<&str> = self.lines.iter().map(|(_, line)| line.as_str()).collect();
        lines.join("\n")
    }

    /// Lines stamped at or after `seq`, plus the cursor to pass next time.
    pub fn since(&self, seq: u64) -> (Vec<String>, u64) {
        let lines = self
            .lines
            .iter()
            .filter(|(stamp, _)| *stamp >= seq)
            .map(|(_, line)| line.clone())
            .collect();
        (lines, self.next_seq)
    }
}

/// Previously run commands, newest first.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, command: impl Into<String>) {
        self.entries.push_front(command.into());
        self.entries.truncate(self.capacity);
    }

    /// `index` 0 is the most recent command.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
