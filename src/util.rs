//! Small utility helpers used across modules.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;

use crate::error::{Error, Result};

/// `Authorization` header value for HTTP Basic auth.
pub fn basic_auth_header(user_id: &str, password: &str) -> String {
  format!("Basic {}", STANDARD.encode(format!("{}:{}", user_id, password)))
}

/// Inverse of `basic_auth_header`: the user id, if the header is a well-formed Basic credential.
pub fn basic_auth_user(header: &str) -> Option<String> {
  let encoded = header.strip_prefix("Basic ")?;
  let decoded = STANDARD.decode(encoded.trim()).ok()?;
  let text = String::from_utf8(decoded).ok()?;
  let (user, _password) = text.split_once(':')?;
  if user.is_empty() { None } else { Some(user.to_string()) }
}

/// Ensure the base URL ends with `/`, so relative endpoints append instead of
/// replacing the last path segment.
pub fn normalize_base_url(url: &str) -> Result<Url> {
  let trimmed = url.trim();
  let with_slash = if trimmed.ends_with('/') { trimmed.to_string() } else { format!("{}/", trimmed) };
  Url::parse(&with_slash).map_err(|e| Error::Config(format!("invalid server URL '{}': {}", trimmed, e)))
}

pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
  base.join(path).map_err(|e| Error::Config(format!("invalid endpoint '{}': {}", path, e)))
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
