//! Environment mapping facade over a single dotenv file.
//!
//! Responsibilities:
//! - Own the parsed document for one backing file from load until reload or
//!   drop, and be its sole mutator and the only writer of the file.
//! - Expose resolved access (plain, typed, required/defaulted), mutation with
//!   write-through persistence, ordered iteration, the secret accessor, the
//!   process-environment export, and the URL config accessors.
//! - Keep the lazy interpolation cache and invalidate it on every write.
//!
//! Does NOT handle:
//! - Line lexing (`parser.rs`), interpolation (`interpolate.rs`), URL
//!   decoding (`decode/`), or the atomic replace itself (`file.rs`).
//!
//! Invariants:
//! - Every mutation persists before the in-memory state changes, so a failed
//!   write leaves both the file and the mapping untouched.
//! - No file locking: a concurrent external writer between load and a later
//!   persist is last-writer-wins.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::RngExt;
use tracing::{debug, info};

use crate::cast;
use crate::constants::{DEFAULT_LIST_SEPARATOR, DEFAULT_SECRET_KEY, SECRET_TOKEN_BYTES};
use crate::decode::{DatabaseConfig, DatabaseDecoder, EmailConfig, EmailDecoder};
use crate::document::Document;
use crate::error::EnvError;
use crate::file::write_atomic;
use crate::interpolate::Resolver;
use crate::parser::{ValueToken, valid_key};

/// Behavioral options for an [`EnvFile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvOptions {
    /// Consult the process environment for `${NAME}` references not defined
    /// in the file before substituting the empty string.
    pub fallback_to_process_env: bool,
}

/// An ordered mapping backed by one dotenv file.
#[derive(Debug)]
pub struct EnvFile {
    path: PathBuf,
    doc: Document,
    options: EnvOptions,
    cache: RefCell<HashMap<String, String>>,
    db_decoder: DatabaseDecoder,
    email_decoder: EmailDecoder,
}

impl EnvFile {
    /// Loads the dotenv file at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        Self::open_with(path, EnvOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: EnvOptions) -> Result<Self, EnvError> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path)?;
        let doc = Document::parse(&text)?;
        debug!(path = %path.display(), entries = doc.len(), "loaded dotenv file");
        Ok(Self {
            path,
            doc,
            options,
            cache: RefCell::new(HashMap::new()),
            db_decoder: DatabaseDecoder::new(),
            email_decoder: EmailDecoder::new(),
        })
    }

    /// Discards the in-memory state and re-parses the backing file.
    pub fn reload(&mut self) -> Result<(), EnvError> {
        let text = std::fs::read_to_string(&self.path)?;
        self.doc = Document::parse(&text)?;
        self.cache.borrow_mut().clear();
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.doc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.doc.contains(key)
    }

    /// The resolved value for a key, or `None` when the key is absent.
    pub fn get(&self, key: &str) -> Result<Option<String>, EnvError> {
        let resolver = Resolver::new(&self.doc, self.options.fallback_to_process_env);
        resolver.resolve(key, &mut self.cache.borrow_mut())
    }

    /// The resolved value for a key that cannot be missing.
    pub fn required(&self, key: &str) -> Result<String, EnvError> {
        self.get(key)?.ok_or_else(|| EnvError::KeyNotFound {
            key: key.to_string(),
        })
    }

    pub fn get_or(&self, key: &str, default: &str) -> Result<String, EnvError> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, EnvError> {
        let value = self.required(key)?;
        cast::cast_bool(key, &value)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, EnvError> {
        match self.get(key)? {
            Some(value) => cast::cast_bool(key, &value),
            None => Ok(default),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i64, EnvError> {
        let value = self.required(key)?;
        cast::cast_int(key, &value)
    }

    pub fn get_int_or(&self, key: &str, default: i64) -> Result<i64, EnvError> {
        match self.get(key)? {
            Some(value) => cast::cast_int(key, &value),
            None => Ok(default),
        }
    }

    pub fn get_float(&self, key: &str) -> Result<f64, EnvError> {
        let value = self.required(key)?;
        cast::cast_float(key, &value)
    }

    pub fn get_float_or(&self, key: &str, default: f64) -> Result<f64, EnvError> {
        match self.get(key)? {
            Some(value) => cast::cast_float(key, &value),
            None => Ok(default),
        }
    }

    /// The value split on the default `,` separator.
    pub fn get_list(&self, key: &str) -> Result<Vec<String>, EnvError> {
        self.get_list_with(key, DEFAULT_LIST_SEPARATOR)
    }

    pub fn get_list_with(&self, key: &str, separator: char) -> Result<Vec<String>, EnvError> {
        let value = self.required(key)?;
        Ok(cast::split_list(&value, separator))
    }

    pub fn get_list_or(&self, key: &str, default: Vec<String>) -> Result<Vec<String>, EnvError> {
        match self.get(key)? {
            Some(value) => Ok(cast::split_list(&value, DEFAULT_LIST_SEPARATOR)),
            None => Ok(default),
        }
    }

    /// Resolved `(key, value)` pairs in first-seen file order.
    pub fn entries(&self) -> Result<Vec<(String, String)>, EnvError> {
        let mut out = Vec::with_capacity(self.doc.len());
        for key in self.doc.keys() {
            let value = self.get(key)?.unwrap_or_default();
            out.push((key.to_string(), value));
        }
        Ok(out)
    }

    /// A fully resolved snapshot of the mapping.
    pub fn resolved(&self) -> Result<HashMap<String, String>, EnvError> {
        Ok(self.entries()?.into_iter().collect())
    }

    /// Upserts a variable and persists immediately. The stored value is taken
    /// literally; dollars in it will not interpolate when read back.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), EnvError> {
        if !valid_key(key) {
            return Err(EnvError::InvalidKey {
                key: key.to_string(),
            });
        }
        let mut next = self.doc.clone();
        next.set(key, ValueToken::from_plain(value));
        self.commit(next)
    }

    /// Removes a variable and persists immediately.
    pub fn remove(&mut self, key: &str) -> Result<(), EnvError> {
        if !self.doc.contains(key) {
            return Err(EnvError::KeyNotFound {
                key: key.to_string(),
            });
        }
        let mut next = self.doc.clone();
        next.remove(key);
        self.commit(next)
    }

    /// Persists a candidate document, then swaps it in. A failed write leaves
    /// the previous state, on disk and in memory, untouched.
    fn commit(&mut self, next: Document) -> Result<(), EnvError> {
        write_atomic(&self.path, &next.serialize())?;
        self.doc = next;
        self.cache.borrow_mut().clear();
        Ok(())
    }

    /// Returns the stored secret, generating and persisting a random token on
    /// first access. An empty stored value counts as absent. Idempotent.
    pub fn secret(&mut self, key: &str) -> Result<String, EnvError> {
        if let Some(existing) = self.get(key)?
            && !existing.is_empty()
        {
            return Ok(existing);
        }
        let mut bytes = [0u8; SECRET_TOKEN_BYTES];
        rand::rng().fill(&mut bytes);
        let token = hex::encode(bytes);
        self.set(key, &token)?;
        info!(key, "generated secret token");
        Ok(token)
    }

    /// [`EnvFile::secret`] for the conventional `SECRET_KEY` variable.
    pub fn secret_key(&mut self) -> Result<String, EnvError> {
        self.secret(DEFAULT_SECRET_KEY)
    }

    /// Copies the resolved mapping into the process environment. Without
    /// `overwrite`, variables already present in the process are preserved.
    pub fn export_to_process(&self, overwrite: bool) -> Result<(), EnvError> {
        for (key, value) in self.entries()? {
            if !overwrite && std::env::var_os(&key).is_some() {
                continue;
            }
            // SAFETY: the engine is single-threaded by contract; callers must
            // not mutate the process environment concurrently.
            unsafe { std::env::set_var(&key, &value) };
        }
        Ok(())
    }

    /// Decodes the named variable as a database connection URL.
    pub fn db(&self, key: &str) -> Result<DatabaseConfig, EnvError> {
        let url = self.required(key)?;
        self.db_decoder
            .decode(&url)
            .map_err(|source| EnvError::Decode {
                key: key.to_string(),
                source,
            })
    }

    /// Decodes the named variable as an e-mail transport URL.
    pub fn email(&self, key: &str) -> Result<EmailConfig, EnvError> {
        let url = self.required(key)?;
        self.email_decoder
            .decode(&url)
            .map_err(|source| EnvError::Decode {
                key: key.to_string(),
                source,
            })
    }

    /// Registers a database scheme for this mapping's decoder.
    pub fn add_database_scheme(&mut self, scheme: &str, backend: &str) {
        self.db_decoder.add_scheme(scheme, backend);
    }

    /// Registers an e-mail scheme for this mapping's decoder.
    pub fn add_email_scheme(&mut self, scheme: &str, backend: &str) {
        self.email_decoder.add_scheme(scheme, backend);
    }

    pub fn database_decoder(&self) -> &DatabaseDecoder {
        &self.db_decoder
    }

    pub fn email_decoder(&self) -> &EmailDecoder {
        &self.email_decoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn env_with(contents: &str) -> (TempDir, EnvFile) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, contents).unwrap();
        let env = EnvFile::open(&path).unwrap();
        (dir, env)
    }

    fn file_contents(env: &EnvFile) -> String {
        std::fs::read_to_string(env.path()).unwrap()
    }

    #[test]
    fn open_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnvFile::open(dir.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, EnvError::Io(_)));
    }

    #[test]
    fn get_resolves_interpolation() {
        let (_dir, env) = env_with("DOMAIN=example.com\nEMAIL=user@${DOMAIN}\n");
        assert_eq!(
            env.get("EMAIL").unwrap().as_deref(),
            Some("user@example.com")
        );
        assert_eq!(env.get("MISSING").unwrap(), None);
    }

    #[test]
    fn required_names_the_missing_key() {
        let (_dir, env) = env_with("A=1\n");
        match env.required("ABSENT") {
            Err(EnvError::KeyNotFound { key }) => assert_eq!(key, "ABSENT"),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn typed_accessors_use_the_interpolated_value() {
        let (_dir, env) = env_with("BASE=4\nPORT=${BASE}2\n");
        assert_eq!(env.get_int("PORT").unwrap(), 42);
    }

    #[test]
    fn typed_defaults_apply_only_when_missing() {
        let (_dir, env) = env_with("FLAG=maybe\n");
        assert!(env.get_bool_or("ABSENT", true).unwrap());
        // present but malformed never falls back to the default
        assert!(matches!(
            env.get_bool_or("FLAG", true),
            Err(EnvError::TypeCast { .. })
        ));
    }

    #[test]
    fn list_accessor_supports_custom_separator() {
        let (_dir, env) = env_with("ITEMS=a:b:c\n");
        assert_eq!(env.get_list_with("ITEMS", ':').unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn set_persists_immediately() {
        let (_dir, mut env) = env_with("A=1\n");
        env.set("B", "2").unwrap();
        assert_eq!(file_contents(&env), "A=1\nB=2\n");

        let reopened = EnvFile::open(env.path()).unwrap();
        assert_eq!(reopened.get("B").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn set_preserves_comments_and_layout() {
        let (_dir, mut env) = env_with("# header\n\nA=1\n");
        env.set("A", "changed").unwrap();
        assert_eq!(file_contents(&env), "# header\n\nA=changed\n");
    }

    #[test]
    fn set_rejects_invalid_keys() {
        let (_dir, mut env) = env_with("A=1\n");
        assert!(matches!(
            env.set("9BAD", "x"),
            Err(EnvError::InvalidKey { .. })
        ));
        assert!(matches!(
            env.set("BAD KEY", "x"),
            Err(EnvError::InvalidKey { .. })
        ));
    }

    #[test]
    fn set_stores_dollars_literally() {
        let (_dir, mut env) = env_with("A=1\n");
        env.set("PRICE", "$100").unwrap();
        assert_eq!(env.get("PRICE").unwrap().as_deref(), Some("$100"));

        let reopened = EnvFile::open(env.path()).unwrap();
        assert_eq!(reopened.get("PRICE").unwrap().as_deref(), Some("$100"));
    }

    #[test]
    fn set_invalidates_the_resolution_cache() {
        let (_dir, mut env) = env_with("NAME=old\nGREETING=hi-${NAME}\n");
        assert_eq!(env.get("GREETING").unwrap().as_deref(), Some("hi-old"));
        env.set("NAME", "new").unwrap();
        assert_eq!(env.get("GREETING").unwrap().as_deref(), Some("hi-new"));
    }

    #[test]
    fn remove_persists_and_errors_on_missing() {
        let (_dir, mut env) = env_with("A=1\nB=2\n");
        env.remove("A").unwrap();
        assert_eq!(file_contents(&env), "B=2\n");
        assert!(matches!(
            env.remove("A"),
            Err(EnvError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn entries_are_ordered_and_resolved() {
        let (_dir, env) = env_with("B=2\nA=${B}1\n# note\nC=3\n");
        let entries = env.entries().unwrap();
        assert_eq!(
            entries,
            [
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "21".to_string()),
                ("C".to_string(), "3".to_string()),
            ]
        );
        assert_eq!(env.len(), 3);
        assert!(env.contains("A"));
        assert!(!env.contains("D"));
    }

    #[test]
    fn secret_is_generated_once_and_persisted() {
        let (_dir, mut env) = env_with("A=1\n");
        let first = env.secret("TOKEN").unwrap();
        let second = env.secret("TOKEN").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), SECRET_TOKEN_BYTES * 2); // hex-encoded

        let matching = file_contents(&env)
            .lines()
            .filter(|line| line.starts_with("TOKEN="))
            .count();
        assert_eq!(matching, 1);
    }

    #[test]
    fn secret_returns_existing_value() {
        let (_dir, mut env) = env_with("TOKEN=already-set\n");
        assert_eq!(env.secret("TOKEN").unwrap(), "already-set");
    }

    #[test]
    fn secret_regenerates_an_empty_value() {
        let (_dir, mut env) = env_with("TOKEN=\n");
        let token = env.secret("TOKEN").unwrap();
        assert!(!token.is_empty());
    }

    #[test]
    fn reload_picks_up_external_changes() {
        let (_dir, mut env) = env_with("A=1\n");
        std::fs::write(env.path(), "A=2\n").unwrap();
        env.reload().unwrap();
        assert_eq!(env.get("A").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn db_accessor_decodes_the_stored_url() {
        let (_dir, env) = env_with("DATABASE_URL=postgres://u:p@host:5432/app\n");
        let config = env.db("DATABASE_URL").unwrap();
        assert_eq!(config.engine, "django.db.backends.postgresql");
        assert_eq!(config.name, "app");
        assert_eq!(config.port, Some(5432));
    }

    #[test]
    fn db_accessor_wraps_decode_errors_with_the_key() {
        let (_dir, env) = env_with("DATABASE_URL=mongodb://u:p@host/app\n");
        match env.db("DATABASE_URL") {
            Err(EnvError::Decode { key, .. }) => assert_eq!(key, "DATABASE_URL"),
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn email_accessor_decodes_the_stored_url() {
        let (_dir, env) = env_with("EMAIL_URL=smtp+tls://u:p@smtp.example.com\n");
        let config = env.email("EMAIL_URL").unwrap();
        assert!(config.use_tls);
        assert_eq!(config.port, Some(587));
    }

    #[test]
    fn custom_schemes_registered_on_the_facade_apply() {
        let (_dir, mut env) = env_with("DATABASE_URL=spatialite://u:p@host/geo\n");
        assert!(env.db("DATABASE_URL").is_err());
        env.add_database_scheme("spatialite", "django.contrib.gis.db.backends.spatialite");
        let config = env.db("DATABASE_URL").unwrap();
        assert_eq!(config.engine, "django.contrib.gis.db.backends.spatialite");
    }

    #[test]
    #[serial]
    fn export_preserves_existing_process_variables() {
        let (_dir, env) = env_with("ENVFILE_EXPORT_A=file\nENVFILE_EXPORT_B=file\n");
        temp_env::with_vars([("ENVFILE_EXPORT_A", Some("process"))], || {
            env.export_to_process(false).unwrap();
            assert_eq!(std::env::var("ENVFILE_EXPORT_A").unwrap(), "process");
            assert_eq!(std::env::var("ENVFILE_EXPORT_B").unwrap(), "file");

            env.export_to_process(true).unwrap();
            assert_eq!(std::env::var("ENVFILE_EXPORT_A").unwrap(), "file");
        });
        // clean up the variable written outside temp_env's management
        // SAFETY: serialized test; no concurrent env access.
        unsafe { std::env::remove_var("ENVFILE_EXPORT_B") };
    }
}
