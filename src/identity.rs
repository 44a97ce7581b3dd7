//! Player identity for a session.
//!
//! A player is either signed in with an externally issued token (durable: the
//! same token always maps to the same id) or anonymous for one session only.

use crate::types::PlayerId;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: PlayerId,
    /// False for anonymous, per-session identities
    pub durable: bool,
}

pub trait IdentityProvider: Send + Sync {
    fn identify(&self) -> Identity;
}

/// Durable identity derived from an auth token.
///
/// Only a digest of the token becomes the player id, so the token itself never
/// ends up in room documents.
pub struct TokenIdentity {
    token: String,
}

impl TokenIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl IdentityProvider for TokenIdentity {
    fn identify(&self) -> Identity {
        let digest = Sha256::digest(self.token.as_bytes());
        let hex = hex::encode(digest);
        Identity {
            id: format!("u_{}", &hex[..28]),
            durable: true,
        }
    }
}

/// Fresh random identity, valid for the current session only
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn identify(&self) -> Identity {
        Identity {
            id: format!("anon_{}", ulid::Ulid::new()),
            durable: false,
        }
    }
}

/// Pick the provider for a connection: token if one was presented, else anonymous
pub fn provider_for(token: Option<&str>) -> Box<dyn IdentityProvider> {
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => Box::new(TokenIdentity::new(token)),
        None => Box::new(AnonymousIdentity),
    }
}
