//! Bearer-credential verification.
//! The identity provider is an external collaborator: it exchanges an opaque
//! bearer credential for a verified `{subject_id, email}` pair or fails.
//! Handlers depend only on the `IdentityVerifier` trait object injected into
//! `AppState`; absence or invalidity of the credential is `None`, never an
//! error, so public endpoints can keep serving an anonymous requester.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::tprintln;

/// The identity the external provider vouched for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUser {
    pub subject_id: String,
    pub email: String,
}

pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, bearer: &str) -> Option<VerifiedUser>;
}

pub type SharedVerifier = Arc<dyn IdentityVerifier>;

/// In-process verifier backed by a token map. Used in dev mode and tests;
/// a deployment substitutes its provider client through the same trait.
#[derive(Default)]
pub struct TokenDirectory {
    tokens: RwLock<HashMap<String, VerifiedUser>>,
}

impl TokenDirectory {
    pub fn new() -> Self { Self::default() }

    pub fn register(&self, token: &str, subject_id: &str, email: &str) {
        let user = VerifiedUser { subject_id: subject_id.to_string(), email: email.to_string() };
        tprintln!("identity.register subject={} token={}", subject_id, token);
        self.tokens.write().insert(token.to_string(), user);
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.write().remove(token).is_some()
    }
}

impl IdentityVerifier for TokenDirectory {
    fn verify(&self, bearer: &str) -> Option<VerifiedUser> {
        self.tokens.read().get(bearer).cloned()
    }
}
