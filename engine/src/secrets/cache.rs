use crate::secrets::string::SecretString;
use crate::secrets::SecretManager;
use sdk::errors::CodifyError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory cache in front of [`SecretManager`].
///
/// Keys are resolved once per process; the web host and the REPL reuse the
/// cached value for every interaction.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Retrieve a secret, checking the memory cache first
    pub fn get_secret(&self, key: &str) -> Result<SecretString, CodifyError> {
        {
            let cache = self.cache.read().expect("SecretCache lock poisoned");
            if let Some(secret) = cache.get(key) {
                return Ok(secret.clone());
            }
        }

        let secret = SecretString::new(self.manager.get_secret(key)?);

        {
            let mut cache = self.cache.write().expect("SecretCache lock poisoned");
            cache.insert(key.to_string(), secret.clone());
        }

        Ok(secret)
    }

    /// Like [`get_secret`](Self::get_secret) but maps a missing key to `None`
    pub fn find_secret(&self, key: &str) -> Result<Option<SecretString>, CodifyError> {
        match self.get_secret(key) {
            Ok(secret) => Ok(Some(secret)),
            Err(CodifyError::MissingApiKey(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Seed the cache without touching the keychain
    pub fn insert(&self, key: impl Into<String>, value: impl Into<SecretString>) {
        let mut cache = self.cache.write().expect("SecretCache lock poisoned");
        cache.insert(key.into(), value.into());
    }

    /// Drop a cached value so the next lookup goes back to the store
    pub fn invalidate(&self, key: &str) {
        let mut cache = self.cache.write().expect("SecretCache lock poisoned");
        cache.remove(key);
    }

    /// Resolve a set of keys up front, failing on the first missing one
    pub fn preload(&self, keys: &[&str]) -> Result<(), CodifyError> {
        for key in keys {
            self.get_secret(key)?;
        }
        Ok(())
    }

    pub fn manager(&self) -> &SecretManager {
        &self.manager
    }
}
