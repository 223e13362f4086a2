//! URL-to-configuration decoders for database and e-mail connection strings.
//!
//! Responsibilities:
//! - Define the mutable scheme registry shared by both decoder shapes.
//! - Define decode errors and the query-parameter coercion helpers.
//!
//! Does NOT handle:
//! - Reading URLs out of a dotenv file (see the facade in `env.rs`); the
//!   decoders are pure functions over their input string.
//!
//! Invariants:
//! - Scheme names are case-insensitive; registering an existing name
//!   overwrites it (last write wins).
//! - Decoders have no side effects on the registry or any shared state;
//!   descriptors are built fresh on every call.
//! - The registries carry no synchronization; multi-threaded callers must
//!   serialize registry mutation and decode calls externally.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::constants::TRUTHY;

mod db;
mod email;

pub use db::{DatabaseConfig, DatabaseDecoder, IsolationLevel};
pub use email::{EmailConfig, EmailDecoder};

/// Errors that can occur while decoding a connection URL.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The URL scheme is not present in the decoder's registry.
    #[error("Unsupported scheme: '{0}'")]
    UnsupportedScheme(String),

    /// A recognized query parameter carries a value outside its coercion
    /// table (bad integer, unknown enumeration member).
    #[error("Invalid value for parameter '{name}': {value:?}")]
    InvalidParameter { name: String, value: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Case-insensitive mapping from URL scheme to backend identifier.
///
/// Each decoder owns one registry; there is no process-global table. Custom
/// schemes registered before a decode call affect all subsequent calls
/// through that decoder.
#[derive(Debug, Clone, Default)]
pub struct SchemeRegistry {
    schemes: HashMap<String, String>,
}

impl SchemeRegistry {
    /// The built-in database schemes and their backend identifiers.
    pub fn database_defaults() -> Self {
        let mut registry = Self::default();
        registry.register("mysql", "django.db.backends.mysql");
        registry.register("oracle", "django.db.backends.oracle");
        registry.register("pgsql", "django.db.backends.postgresql");
        registry.register("postgres", "django.db.backends.postgresql");
        registry.register("postgresql", "django.db.backends.postgresql");
        registry.register("sqlite", "django.db.backends.sqlite3");
        registry.register("sqlite3", "django.db.backends.sqlite3");
        registry
    }

    /// The built-in e-mail schemes and their backend identifiers.
    pub fn email_defaults() -> Self {
        let mut registry = Self::default();
        registry.register("smtp", "django.core.mail.backends.smtp.EmailBackend");
        registry.register("smtp+tls", "django.core.mail.backends.smtp.EmailBackend");
        registry.register("smtp+ssl", "django.core.mail.backends.smtp.EmailBackend");
        registry.register("console", "django.core.mail.backends.console.EmailBackend");
        registry.register("file", "django.core.mail.backends.filebased.EmailBackend");
        registry.register("memory", "django.core.mail.backends.locmem.EmailBackend");
        registry.register("dummy", "django.core.mail.backends.dummy.EmailBackend");
        registry
    }

    /// Registers a scheme, overwriting any existing entry for the name.
    pub fn register(&mut self, scheme: &str, backend: &str) {
        self.schemes
            .insert(scheme.to_ascii_lowercase(), backend.to_string());
    }

    /// The backend identifier for a scheme, case-insensitively.
    pub fn backend(&self, scheme: &str) -> Option<&str> {
        self.schemes
            .get(&scheme.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.schemes.contains_key(&scheme.to_ascii_lowercase())
    }
}

/// Percent-decodes a URL component, lossily for invalid UTF-8.
pub(crate) fn decoded(component: &str) -> String {
    percent_decode_str(component)
        .decode_utf8_lossy()
        .into_owned()
}

/// Decoded query pairs in order; callers apply last-occurrence-wins by
/// assigning in sequence.
pub(crate) fn query_pairs(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Lenient boolean for query parameters: the truthy literal set means true,
/// anything else means false.
pub(crate) fn lenient_bool(value: &str) -> bool {
    TRUTHY.contains(&value.to_ascii_lowercase().as_str())
}

pub(crate) fn int_param(name: &str, value: &str) -> Result<i64, DecodeError> {
    value
        .parse()
        .map_err(|_| DecodeError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let registry = SchemeRegistry::database_defaults();
        assert_eq!(registry.backend("MySQL"), registry.backend("mysql"));
        assert!(registry.contains("POSTGRES"));
    }

    #[test]
    fn register_overwrites_existing_scheme() {
        let mut registry = SchemeRegistry::database_defaults();
        registry.register("mysql", "custom.backend");
        assert_eq!(registry.backend("mysql"), Some("custom.backend"));
    }

    #[test]
    fn decoded_unescapes_percent_sequences() {
        assert_eq!(decoded("p%40ss%3Aword"), "p@ss:word");
        assert_eq!(decoded("plain"), "plain");
    }

    #[test]
    fn query_pairs_decode_in_order() {
        let pairs = query_pairs("a=1&b=two%20words&a=3");
        assert_eq!(
            pairs,
            [
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two words".to_string()),
                ("a".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn lenient_bool_defaults_to_false() {
        assert!(lenient_bool("YES"));
        assert!(lenient_bool("1"));
        assert!(!lenient_bool("off"));
        assert!(!lenient_bool("anything"));
    }
}
