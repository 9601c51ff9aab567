//! Anonymous per-profile identity
//!
//! The backend correlates uploads, analysis jobs and results by an opaque
//! `userId`. There are no accounts: the first call to
//! [`IdentityProvider::get`] mints a token and stores it under
//! [`USER_ID_KEY`]; every later call returns the stored token.

use crate::db::Result;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use tracing::{debug, warn};

/// Storage key holding the identity
pub const USER_ID_KEY: &str = "ti_userId";

/// Minimal string key/value persistence
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

pub struct IdentityProvider<S> {
    store: S,
}

impl<S: KeyValueStore> IdentityProvider<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Return the persisted identity, creating it on first use.
    ///
    /// Storage failures never surface: the caller gets a fresh identity that
    /// is not persisted, so the next call will mint another one.
    pub fn get(&self) -> String {
        match self.store.get(USER_ID_KEY) {
            Ok(Some(id)) if !id.trim().is_empty() => return id,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "identity storage unreadable, using an unpersisted identity");
                return generate();
            }
        }

        let id = generate();
        if let Err(e) = self.store.set(USER_ID_KEY, &id) {
            warn!(error = %e, "failed to persist identity");
        } else {
            debug!(identity = %id, "created anonymous identity");
        }
        id
    }
}

/// Mint a new identity: a random UUID, or the composite form when the OS
/// random source is unavailable.
pub fn generate() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes).into_uuid().to_string(),
        Err(e) => {
            debug!(error = %e, "OS randomness unavailable, using composite identity");
            composite()
        }
    }
}

/// `anon-<unix millis>-<0..1_000_000>`
pub fn composite() -> String {
    format!(
        "anon-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        rand::thread_rng().gen_range(0..1_000_000u32)
    )
}
