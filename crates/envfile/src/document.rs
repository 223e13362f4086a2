//! Ordered in-memory representation of a dotenv file.
//!
//! Responsibilities:
//! - Hold the full line layout (entries, comments, blanks) in file order.
//! - Maintain a key -> position index for O(1) lookup.
//! - Apply the duplicate-key policy: last value wins, first position kept,
//!   later duplicate lines dropped on rewrite.
//! - Serialize back to text, preserving comment and blank lines positionally.
//!
//! Does NOT handle:
//! - File I/O (see `file.rs` and the facade in `env.rs`).
//! - Interpolation or caching of resolved values (see `interpolate.rs`).
//!
//! Invariants:
//! - `index` maps every entry key to its position in `lines`; it is rebuilt
//!   whenever positions shift.
//! - Iteration order is first-seen key order.

use std::collections::HashMap;

use crate::error::EnvError;
use crate::parser::{Line, ValueToken, parse_line, serialize_value};

#[derive(Debug, Clone, Default)]
pub(crate) struct Document {
    lines: Vec<Line>,
    index: HashMap<String, usize>,
}

impl Document {
    pub(crate) fn parse(text: &str) -> Result<Self, EnvError> {
        let mut doc = Document::default();
        for (n, raw) in text.lines().enumerate() {
            match parse_line(raw, n + 1)? {
                Line::Entry { key, value } => match doc.index.get(&key) {
                    Some(&at) => {
                        // Duplicate key: the later value supersedes the
                        // earlier one in place; the later line disappears.
                        doc.lines[at] = Line::Entry { key, value };
                    }
                    None => {
                        doc.index.insert(key.clone(), doc.lines.len());
                        doc.lines.push(Line::Entry { key, value });
                    }
                },
                other => doc.lines.push(other),
            }
        }
        Ok(doc)
    }

    pub(crate) fn serialize(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Blank => {}
                Line::Comment(text) => out.push_str(text),
                Line::Entry { key, value } => {
                    out.push_str(key);
                    if let Some(token) = value {
                        out.push('=');
                        out.push_str(&serialize_value(token));
                    }
                }
            }
            out.push('\n');
        }
        out
    }

    /// The value token for a key. `None` when the key is absent or was a bare
    /// declaration; use [`Document::contains`] to tell those apart.
    pub(crate) fn token(&self, key: &str) -> Option<&ValueToken> {
        let &at = self.index.get(key)?;
        match &self.lines[at] {
            Line::Entry { value, .. } => value.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Entry keys in first-seen file order.
    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, .. } => Some(key.as_str()),
            _ => None,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    /// Upserts an entry. An existing key keeps its position.
    pub(crate) fn set(&mut self, key: &str, value: ValueToken) {
        match self.index.get(key) {
            Some(&at) => {
                self.lines[at] = Line::Entry {
                    key: key.to_string(),
                    value: Some(value),
                };
            }
            None => {
                self.index.insert(key.to_string(), self.lines.len());
                self.lines.push(Line::Entry {
                    key: key.to_string(),
                    value: Some(value),
                });
            }
        }
    }

    /// Removes an entry line entirely. Returns whether the key was present.
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        let Some(&at) = self.index.get(key) else {
            return false;
        };
        self.lines.remove(at);
        self.reindex();
        true
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (at, line) in self.lines.iter().enumerate() {
            if let Line::Entry { key, .. } = line {
                self.index.insert(key.clone(), at);
            }
        }
    }
}
