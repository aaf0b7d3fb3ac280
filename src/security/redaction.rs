//! Redaction of secrets and elevation prompts in captured process output
//!
//! Everything leaving the executor (shown to the user or written to the
//! audit log) passes through here first.

use crate::core::traits::ExecutionResult;
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::borrow::Cow;

/// Replacement for a redacted secret
pub const MASK: &str = "****";

/// Prompt printed by `sudo -S` on stderr before it reads the password
const SUDO_PROMPT_PATTERN: &str = r"\[sudo\] password for [^:\n]*: ?";

/// Replace every standalone occurrence of `secret` in `bytes` with [`MASK`]
///
/// An occurrence counts only when it is not glued to ASCII letters or digits
/// on either side, so a short secret such as `a` masks `a` but leaves
/// `pacman` intact. A secret echoed inside a longer word stays visible.
///
/// # Examples
///
/// ```
/// use fkinstall::security::redaction::mask_secret;
/// use secrecy::SecretString;
///
/// let secret = SecretString::from("hunter2".to_string());
/// assert_eq!(&*mask_secret(b"pw=hunter2", &secret), b"pw=****");
/// ```
pub fn mask_secret<'a>(bytes: &'a [u8], secret: &SecretString) -> Cow<'a, [u8]> {
    let secret = secret.expose_secret();
    if secret.is_empty() {
        return Cow::Borrowed(bytes);
    }

    let Ok(regex) = Regex::new(&regex::escape(secret)) else {
        return Cow::Borrowed(bytes);
    };

    let mut masked = Vec::new();
    let mut copied = 0;
    for found in regex.find_iter(bytes) {
        let (start, end) = (found.start(), found.end());
        if !is_standalone(bytes, start, end) {
            continue;
        }
        masked.extend_from_slice(&bytes[copied..start]);
        masked.extend_from_slice(MASK.as_bytes());
        copied = end;
    }

    if copied == 0 && masked.is_empty() {
        return Cow::Borrowed(bytes);
    }
    masked.extend_from_slice(&bytes[copied..]);
    Cow::Owned(masked)
}

fn is_standalone(bytes: &[u8], start: usize, end: usize) -> bool {
    let before = start.checked_sub(1).and_then(|i| bytes.get(i));
    let after = bytes.get(end);
    [before, after]
        .into_iter()
        .flatten()
        .all(|b| !b.is_ascii_alphanumeric())
}

/// Remove `[sudo] password for <user>:` prompts, keeping what follows them
pub fn strip_elevation_prompts(bytes: &[u8]) -> Cow<'_, [u8]> {
    match Regex::new(SUDO_PROMPT_PATTERN) {
        Ok(regex) => regex.replace_all(bytes, &b""[..]),
        Err(_) => Cow::Borrowed(bytes),
    }
}

/// Scrub a result before it leaves the executor
pub fn scrub_result(result: ExecutionResult, secret: Option<&SecretString>) -> ExecutionResult {
    match result {
        ExecutionResult::Success { output } => ExecutionResult::Success {
            output: scrub(&output, secret, false),
        },
        ExecutionResult::Failure { diagnostic, cause } => ExecutionResult::Failure {
            diagnostic: scrub(&diagnostic, secret, true),
            cause,
        },
    }
}

fn scrub(bytes: &[u8], secret: Option<&SecretString>, strip_prompts: bool) -> Vec<u8> {
    let masked = match secret {
        Some(secret) => mask_secret(bytes, secret),
        None => Cow::Borrowed(bytes),
    };

    if strip_prompts {
        strip_elevation_prompts(&masked).into_owned()
    } else {
        masked.into_owned()
    }
}
