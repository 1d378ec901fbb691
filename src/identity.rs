//! Client identity for admission control.
//!
//! Identities are derived from the originating address and hashed before
//! they are used as store keys, so raw addresses are never persisted.

use sha2::{Digest, Sha256};

/// A hashed client identity, 16 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Derive an identity from a forwarded-address header chain and the
    /// direct peer address. The first non-empty entry in the chain is the
    /// originating client; intervening proxies are ignored. Without a
    /// chain, the peer address is used.
    pub fn derive(forwarded_for: Option<&str>, peer_addr: &str) -> Self {
        let raw = forwarded_for
            .and_then(|chain| chain.split(',').map(str::trim).find(|e| !e.is_empty()))
            .unwrap_or(peer_addr);
        Self::from_raw(raw)
    }

    /// Hash an arbitrary identity string into the fixed-width key form.
    pub fn from_raw(raw: &str) -> Self {
        let digest = Sha256::digest(raw.as_bytes());
        let mut hex = String::with_capacity(16);
        for byte in &digest[..8] {
            hex.push_str(&format!("{:02x}", byte));
        }
        ClientId(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
