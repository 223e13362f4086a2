//! Centralized constants for the dotenv engine.
//!
//! This module contains default values used across modules to avoid
//! magic number duplication and improve maintainability.

// =============================================================================
// Boolean Literals
// =============================================================================

/// Literals accepted as `true` by the strict boolean cast (case-insensitive).
pub const TRUTHY: [&str; 4] = ["1", "true", "yes", "on"];

/// Literals accepted as `false` by the strict boolean cast (case-insensitive).
pub const FALSY: [&str; 4] = ["0", "false", "no", "off"];

// =============================================================================
// Accessor Defaults
// =============================================================================

/// Default separator for list-valued variables.
pub const DEFAULT_LIST_SEPARATOR: char = ',';

/// Default variable name used by the secret accessor.
pub const DEFAULT_SECRET_KEY: &str = "SECRET_KEY";

/// Number of random bytes in a generated secret token (hex-encoded on write).
pub const SECRET_TOKEN_BYTES: usize = 32;

// =============================================================================
// E-mail Transport Defaults
// =============================================================================

/// Default host when an e-mail URL carries no host component.
pub const DEFAULT_EMAIL_HOST: &str = "localhost";

/// Default plain SMTP port.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Default SMTP port when STARTTLS is requested.
pub const DEFAULT_SMTP_TLS_PORT: u16 = 587;

/// Default SMTP port for implicit SSL.
pub const DEFAULT_SMTP_SSL_PORT: u16 = 465;
