//! POSIX-style variable interpolation over a parsed document.
//!
//! Responsibilities:
//! - Expand `${NAME}` and bare `$NAME` references against the document,
//!   substituting the *resolved* value of the referenced entry.
//! - Detect self-references and cycles with a visited stack and fail fast.
//! - Optionally fall back to the process environment for undefined names.
//!
//! Does NOT handle:
//! - Escape decoding; `\$` arrives from the lexer as a tagged fragment and is
//!   emitted as a plain dollar here, never expanded.
//! - Cache ownership; the caller passes the resolved-value cache in and is
//!   responsible for invalidating it on writes.
//!
//! Invariants:
//! - Undefined references substitute the empty string, never fail.
//! - Single-quoted values are returned verbatim without scanning.
//! - Malformed references (`${` without `}`, `$` before a non-identifier)
//!   are literal text.

use std::collections::HashMap;

use crate::document::Document;
use crate::error::EnvError;
use crate::parser::{Fragment, ValueToken};

pub(crate) struct Resolver<'a> {
    doc: &'a Document,
    fallback_to_process_env: bool,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(doc: &'a Document, fallback_to_process_env: bool) -> Self {
        Self {
            doc,
            fallback_to_process_env,
        }
    }

    /// Resolves a key to its interpolated value, or `None` if the key is not
    /// defined in the document.
    pub(crate) fn resolve(
        &self,
        key: &str,
        cache: &mut HashMap<String, String>,
    ) -> Result<Option<String>, EnvError> {
        if !self.doc.contains(key) {
            return Ok(None);
        }
        let mut stack = Vec::new();
        self.resolve_entry(key, cache, &mut stack).map(Some)
    }

    fn resolve_entry(
        &self,
        key: &str,
        cache: &mut HashMap<String, String>,
        stack: &mut Vec<String>,
    ) -> Result<String, EnvError> {
        if let Some(hit) = cache.get(key) {
            return Ok(hit.clone());
        }
        if stack.iter().any(|seen| seen == key) {
            return Err(EnvError::CircularReference {
                key: key.to_string(),
            });
        }
        // Bare declarations resolve as empty.
        let Some(token) = self.doc.token(key) else {
            return Ok(String::new());
        };
        stack.push(key.to_string());
        let resolved = self.resolve_token(token, cache, stack)?;
        stack.pop();
        cache.insert(key.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_token(
        &self,
        token: &ValueToken,
        cache: &mut HashMap<String, String>,
        stack: &mut Vec<String>,
    ) -> Result<String, EnvError> {
        if !token.interpolates() {
            return Ok(token.literal());
        }
        let mut out = String::new();
        for fragment in &token.fragments {
            match fragment {
                Fragment::Dollar => out.push('$'),
                Fragment::Text(text) => self.expand_text(text, &mut out, cache, stack)?,
            }
        }
        Ok(out)
    }

    fn expand_text(
        &self,
        text: &str,
        out: &mut String,
        cache: &mut HashMap<String, String>,
        stack: &mut Vec<String>,
    ) -> Result<(), EnvError> {
        let mut rest = text;
        while let Some(at) = rest.find('$') {
            out.push_str(&rest[..at]);
            let after = &rest[at + 1..];
            if let Some(braced) = after.strip_prefix('{') {
                if let Some(end) = braced.find('}') {
                    let name = &braced[..end];
                    if identifier_len(name) == name.len() && !name.is_empty() {
                        out.push_str(&self.lookup(name, cache, stack)?);
                        rest = &braced[end + 1..];
                        continue;
                    }
                }
                // unterminated or non-identifier reference: literal text
                out.push('$');
                rest = after;
            } else {
                let end = identifier_len(after);
                if end == 0 {
                    out.push('$');
                    rest = after;
                } else {
                    out.push_str(&self.lookup(&after[..end], cache, stack)?);
                    rest = &after[end..];
                }
            }
        }
        out.push_str(rest);
        Ok(())
    }

    fn lookup(
        &self,
        name: &str,
        cache: &mut HashMap<String, String>,
        stack: &mut Vec<String>,
    ) -> Result<String, EnvError> {
        if self.doc.contains(name) {
            return self.resolve_entry(name, cache, stack);
        }
        if self.fallback_to_process_env {
            return Ok(std::env::var(name).unwrap_or_default());
        }
        Ok(String::new())
    }
}

/// Length of the leading identifier run (`[A-Za-z_][A-Za-z0-9_]*`), in bytes.
fn identifier_len(s: &str) -> usize {
    let mut len = 0;
    for (at, ch) in s.char_indices() {
        let valid = if at == 0 {
            ch.is_ascii_alphabetic() || ch == '_'
        } else {
            ch.is_ascii_alphanumeric() || ch == '_'
        };
        if !valid {
            break;
        }
        len = at + ch.len_utf8();
    }
    len
}
