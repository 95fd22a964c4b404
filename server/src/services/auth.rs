//! Token verification and participant identity.
//!
//! DESIGN
//! ======
//! Tokens are opaque bearer credentials: hex-encoded JSON claims plus a
//! sha256 detached signature over the secret and the claims. Verification
//! fails closed — any split, decode, signature, or expiry problem yields
//! `None` and the caller mints a guest identity instead. Nothing here ever
//! treats a broken token as trusted.
//!
//! Guest grants issued for anonymous participants use the same signer with
//! a fixed validity window, so a guest-token holder verifies like any other
//! bearer but keeps the `guest-` prefixed id.

use std::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use protocol::{GUEST_ID_PREFIX, is_guest_id};

/// Validity window for issued guest tokens.
pub const GUEST_TOKEN_TTL_MS: i64 = 3 * 60 * 60 * 1000;

/// Current time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn hex_to_bytes(hex: &str) -> Option<Vec<u8>> {
    if !hex.is_ascii() || hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

// =============================================================================
// CLAIMS AND IDENTITY
// =============================================================================

/// Signed token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user id (or a `guest-` prefixed id for issued guest grants).
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Expiry, milliseconds since the Unix epoch.
    pub exp: i64,
}

/// Issued guest credential.
#[derive(Debug, Clone)]
pub struct GuestGrant {
    pub token: String,
    pub guest_id: String,
}

/// Resolved identity for a connection.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub user_name: String,
    /// True iff the identity came out of a token that verified.
    pub verified: bool,
}

impl Identity {
    /// True iff the id is a generated guest id.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        is_guest_id(&self.user_id)
    }

    /// True iff the member presented a verifiable non-guest credential.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.verified && !self.is_guest()
    }
}

// =============================================================================
// TOKEN SIGNER
// =============================================================================

/// Signs and verifies bearer tokens with a shared secret.
pub struct TokenSigner {
    secret: String,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Signer with a random secret. Tokens stop verifying after a restart;
    /// used only when no secret is configured.
    #[must_use]
    pub fn ephemeral() -> Self {
        let bytes: [u8; 32] = rand::rng().random();
        Self { secret: bytes_to_hex(&bytes) }
    }

    fn digest(&self, payload: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b".");
        hasher.update(payload);
        bytes_to_hex(&hasher.finalize())
    }

    /// Sign claims into a bearer token.
    #[must_use]
    pub fn sign(&self, claims: &Claims) -> String {
        // Serializing strings and ints cannot fail; an empty payload would
        // simply never verify.
        let payload = serde_json::to_string(claims).unwrap_or_default();
        format!("{}.{}", bytes_to_hex(payload.as_bytes()), self.digest(payload.as_bytes()))
    }

    /// Verify a token. Any malformed input, signature mismatch, or expiry
    /// yields `None`.
    #[must_use]
    pub fn verify(&self, token: &str, now_ms: i64) -> Option<Claims> {
        let (payload_hex, signature) = token.split_once('.')?;
        let payload = hex_to_bytes(payload_hex)?;
        if self.digest(&payload) != signature {
            return None;
        }
        let claims: Claims = serde_json::from_slice(&payload).ok()?;
        if claims.exp <= now_ms {
            return None;
        }
        Some(claims)
    }

    /// Issue a guest credential with a fresh generated id.
    #[must_use]
    pub fn issue_guest(&self, now_ms: i64) -> GuestGrant {
        let guest_id = format!("{GUEST_ID_PREFIX}{}", Uuid::new_v4());
        let token = self.sign(&Claims {
            sub: guest_id.clone(),
            name: "Guest".to_string(),
            exp: now_ms + GUEST_TOKEN_TTL_MS,
        });
        GuestGrant { token, guest_id }
    }
}

/// Resolve the identity for a connection attempt. An absent or unverifiable
/// token mints a fresh guest identity.
#[must_use]
pub fn resolve_identity(signer: &TokenSigner, token: Option<&str>, now_ms: i64) -> Identity {
    match token.and_then(|t| signer.verify(t, now_ms)) {
        Some(claims) => Identity {
            user_id: claims.sub,
            user_name: claims.name,
            verified: true,
        },
        None => Identity {
            user_id: format!("{GUEST_ID_PREFIX}{}", Uuid::new_v4()),
            user_name: "Guest".to_string(),
            verified: false,
        },
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
