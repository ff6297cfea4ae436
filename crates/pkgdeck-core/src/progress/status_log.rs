use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    #[default]
    Output,
    Warning,
    Error,
    Verbose,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputLine {
    pub text: String,
    pub kind: LineKind,
    pub new_line: bool,
    pub timestamp: DateTime<Utc>,
}

impl OutputLine {
    pub fn new(text: impl Into<String>, kind: LineKind, new_line: bool) -> Self {
        Self {
            text: text.into(),
            kind,
            new_line,
            timestamp: Utc::now(),
        }
    }
}

/// Fixed-capacity transcript; the oldest line is dropped on overflow.
#[derive(Debug)]
pub struct StatusLog {
    capacity: usize,
    lines: Mutex<VecDeque<OutputLine>>,
}

impl StatusLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, line: OutputLine) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<OutputLine> {
        self.lock().iter().cloned().collect()
    }

    /// Renders the retained lines as text, honoring each line's `new_line`
    /// flag.
    #[must_use]
    pub fn transcript(&self) -> String {
        let lines = self.lock();
        let mut out = String::new();
        for line in lines.iter() {
            out.push_str(&line.text);
            if line.new_line {
                out.push('\n');
            }
        }
        out
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<OutputLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
