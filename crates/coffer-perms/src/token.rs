//! Invite tokens.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of random bytes behind a token (128 bits of entropy).
pub const TOKEN_LEN: usize = 16;

/// An opaque, system-wide unique invite token.
///
/// Generated from the OS CSPRNG and hex-encoded for the wire. Possession
/// alone does not authorize redemption; the redeeming caller's verified
/// email must also match the invite.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteToken(String);

impl InviteToken {
    /// Generate a fresh token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a token string received from a caller.
    ///
    /// No validation beyond ownership: an unknown token simply fails the
    /// store lookup.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Display and Debug are truncated so full tokens never land in logs.
// Truncation counts chars, not bytes: caller-supplied tokens are not
// guaranteed to be ASCII.
fn prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(idx, _)| idx)
        .unwrap_or(token.len());
    &token[..end]
}

impl fmt::Display for InviteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", prefix(&self.0))
    }
}

impl fmt::Debug for InviteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InviteToken({}…)", prefix(&self.0))
    }
}
