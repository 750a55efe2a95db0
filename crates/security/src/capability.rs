//! Capability token verification.
//!
//! Capabilities travel as HS256-signed JWTs with compact claim names:
//! `ad` (admin), `w` (workspace), `s` (session), `p` (peer), plus an
//! optional `exp`. Verification maps the claims onto a [`CapabilityToken`].

use colloquy_core::CapabilityToken;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wire claims of a capability token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

impl From<CapabilityClaims> for CapabilityToken {
    fn from(claims: CapabilityClaims) -> Self {
        Self {
            admin: claims.ad.unwrap_or(false),
            workspace_scope: claims.w,
            session_scope: claims.s,
            peer_scope: claims.p,
        }
    }
}

/// Errors from token verification or issuance.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("capability token has expired")]
    Expired,

    #[error("invalid capability token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Verifies and issues capability tokens with a shared secret.
pub struct CapabilityVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for CapabilityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityVerifier")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl CapabilityVerifier {
    pub fn new(secret: &str) -> Result<Self, CapabilityError> {
        if secret.is_empty() {
            return Err(CapabilityError::EmptySecret);
        }

        // Long-lived tokens carry no `exp`; it is checked only when present.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Decode and verify a raw token string.
    pub fn verify(&self, token: &str) -> Result<CapabilityToken, CapabilityError> {
        let data = decode::<CapabilityClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => CapabilityError::Expired,
                _ => CapabilityError::Invalid(e),
            })?;
        Ok(data.claims.into())
    }

    /// Sign a capability, optionally expiring after `ttl`.
    pub fn issue(
        &self,
        capability: &CapabilityToken,
        ttl: Option<Duration>,
    ) -> Result<String, CapabilityError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let claims = CapabilityClaims {
            ad: capability.admin.then_some(true),
            w: capability.workspace_scope.clone(),
            s: capability.session_scope.clone(),
            p: capability.peer_scope.clone(),
            iat: Some(now),
            exp: ttl.map(|ttl| now + ttl.as_secs()),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
