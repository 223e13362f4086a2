//! Line lexer and serializer for dotenv files.
//!
//! Responsibilities:
//! - Classify a physical line as blank, comment, or `KEY[=VALUE]` assignment.
//! - Decode quoted values (double quotes with escapes, single quotes literal)
//!   and strip trailing comments from bare values.
//! - Re-emit a value with minimal quoting so it re-parses to the same meaning.
//!
//! Does NOT handle:
//! - Ordering, duplicate keys, or whole-file layout (see `document.rs`).
//! - Variable interpolation (see `interpolate.rs`); the lexer only tags which
//!   `$` occurrences were escaped so the interpolator can skip them.
//!
//! Invariants:
//! - Keys match `[A-Za-z_][A-Za-z0-9_]*` and are never the bare underscore.
//! - A `\$` escape survives lexing as `Fragment::Dollar` in every quoting
//!   style that interpolates; single-quoted content is a single literal run.
//! - Malformed input fails with the one-based line number and raw content.

use crate::error::EnvError;

/// Quoting style a value was written with. Single-quoted values never
/// interpolate; the serializer preserves that style to keep the semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quoting {
    Bare,
    Single,
    Double,
}

/// One run of a decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fragment {
    Text(String),
    /// A `\$` escape: a literal dollar sign the interpolator must not expand.
    Dollar,
}

/// A decoded value plus the quoting it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValueToken {
    pub(crate) fragments: Vec<Fragment>,
    pub(crate) quoting: Quoting,
}

impl ValueToken {
    /// Builds a token from a programmatic value. Every `$` becomes a literal
    /// dollar so stored values never start interpolating by accident.
    pub(crate) fn from_plain(value: &str) -> Self {
        let mut fragments = Vec::new();
        let mut text = String::new();
        for ch in value.chars() {
            if ch == '$' {
                if !text.is_empty() {
                    fragments.push(Fragment::Text(std::mem::take(&mut text)));
                }
                fragments.push(Fragment::Dollar);
            } else {
                text.push(ch);
            }
        }
        if !text.is_empty() {
            fragments.push(Fragment::Text(text));
        }
        Self {
            fragments,
            quoting: Quoting::Bare,
        }
    }

    /// The decoded value with no interpolation applied.
    pub(crate) fn literal(&self) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Text(text) => out.push_str(text),
                Fragment::Dollar => out.push('$'),
            }
        }
        out
    }

    /// Whether `$` references inside this value are subject to interpolation.
    pub(crate) fn interpolates(&self) -> bool {
        self.quoting != Quoting::Single
    }
}

/// One logical line of a dotenv file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line {
    Blank,
    /// A comment-only line, kept verbatim for positional rewrite.
    Comment(String),
    /// `KEY=VALUE`, or a bare `KEY` declaration when `value` is `None`.
    Entry {
        key: String,
        value: Option<ValueToken>,
    },
}

/// Identifier syntax for keys: letters, digits, underscore, not starting with
/// a digit. The bare underscore is rejected.
pub(crate) fn valid_key(key: &str) -> bool {
    if key == "_" {
        return false;
    }
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parses one physical line. `number` is one-based and only used for error
/// reporting.
pub(crate) fn parse_line(raw: &str, number: usize) -> Result<Line, EnvError> {
    let line = raw.trim_end_matches(['\r', '\n']);
    let malformed = || EnvError::MalformedLine {
        line: number,
        content: line.to_string(),
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Line::Blank);
    }
    if trimmed.starts_with('#') {
        return Ok(Line::Comment(line.to_string()));
    }

    let (key_part, value_part) = match line.split_once('=') {
        Some((key, value)) => (key.trim(), Some(value)),
        None => (trimmed, None),
    };
    if !valid_key(key_part) {
        return Err(malformed());
    }

    let key = key_part.to_string();
    let Some(rest) = value_part else {
        return Ok(Line::Entry { key, value: None });
    };
    let value = lex_value(rest).ok_or_else(malformed)?;
    Ok(Line::Entry {
        key,
        value: Some(value),
    })
}

fn lex_value(rest: &str) -> Option<ValueToken> {
    let s = rest.trim_start();
    match s.chars().next() {
        Some('"') => lex_double(&s[1..]),
        Some('\'') => lex_single(&s[1..]),
        _ => Some(lex_bare(s)),
    }
}

/// After a closing quote, only whitespace or a trailing comment may follow.
fn only_trailing_comment(rest: &str) -> bool {
    let trimmed = rest.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn lex_double(s: &str) -> Option<ValueToken> {
    let mut fragments = Vec::new();
    let mut text = String::new();
    let mut chars = s.char_indices();
    while let Some((at, ch)) = chars.next() {
        match ch {
            '"' => {
                if !only_trailing_comment(&s[at + 1..]) {
                    return None; // surplus token after the closing quote
                }
                if !text.is_empty() {
                    fragments.push(Fragment::Text(text));
                }
                return Some(ValueToken {
                    fragments,
                    quoting: Quoting::Double,
                });
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, '\\')) => text.push('\\'),
                Some((_, '"')) => text.push('"'),
                Some((_, '$')) => {
                    if !text.is_empty() {
                        fragments.push(Fragment::Text(std::mem::take(&mut text)));
                    }
                    fragments.push(Fragment::Dollar);
                }
                // Unknown escapes are kept verbatim.
                Some((_, other)) => {
                    text.push('\\');
                    text.push(other);
                }
                None => return None,
            },
            _ => text.push(ch),
        }
    }
    None // unterminated quote
}

fn lex_single(s: &str) -> Option<ValueToken> {
    let end = s.find('\'')?;
    if !only_trailing_comment(&s[end + 1..]) {
        return None;
    }
    let mut fragments = Vec::new();
    if end > 0 {
        fragments.push(Fragment::Text(s[..end].to_string()));
    }
    Some(ValueToken {
        fragments,
        quoting: Quoting::Single,
    })
}

fn lex_bare(s: &str) -> ValueToken {
    let mut fragments = Vec::new();
    let mut text = String::new();
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '#' => break, // trailing comment
            '\\' if chars.peek() == Some(&'$') => {
                chars.next();
                if !text.is_empty() {
                    fragments.push(Fragment::Text(std::mem::take(&mut text)));
                }
                fragments.push(Fragment::Dollar);
            }
            _ => text.push(ch),
        }
    }
    let trimmed = text.trim_end();
    if !trimmed.is_empty() {
        fragments.push(Fragment::Text(trimmed.to_string()));
    }
    ValueToken {
        fragments,
        quoting: Quoting::Bare,
    }
}

/// Whether a literal can only be re-emitted inside double quotes.
fn needs_quoting(literal: &str) -> bool {
    literal.is_empty()
        || literal.starts_with('\'')
        || literal.starts_with('"')
        || literal
            .chars()
            .any(|c| c.is_whitespace() || c == '#' || c.is_control())
}

/// Serializes a value with minimal quoting. The emitted form re-parses to the
/// same fragments; only the quoting style may normalize.
pub(crate) fn serialize_value(token: &ValueToken) -> String {
    if token.quoting == Quoting::Single {
        // Single-quoted content cannot contain a quote (the lexer stops at the
        // first one), so re-emitting verbatim is safe.
        return format!("'{}'", token.literal());
    }
    if needs_quoting(&token.literal()) {
        return serialize_double(token);
    }
    let mut out = String::new();
    for fragment in &token.fragments {
        match fragment {
            Fragment::Text(text) => out.push_str(text),
            Fragment::Dollar => out.push_str("\\$"),
        }
    }
    out
}

fn serialize_double(token: &ValueToken) -> String {
    let mut out = String::from("\"");
    for fragment in &token.fragments {
        match fragment {
            Fragment::Dollar => out.push_str("\\$"),
            Fragment::Text(text) => {
                for ch in text.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '"' => out.push_str("\\\""),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        _ => out.push(ch),
                    }
                }
            }
        }
    }
    out.push('"');
    out
}
