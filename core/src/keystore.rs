use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use josekit::JoseError;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

use idp_types::jose::jwk_set::JwkSet;
use idp_types::jose::jws::SigningAlgorithm;

use crate::configuration::clock::Clock;
use crate::configuration::ProviderConfiguration;
use crate::key_material::{KeyMaterial, PublicKeyView};

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("Error generating {algorithm} signing key")]
    KeyGeneration {
        algorithm: SigningAlgorithm,
        #[source]
        source: JoseError,
    },
    #[error("No active signing key for {}", .0)]
    NoActiveKey(SigningAlgorithm),
    #[error("Invalid signing key: {}", .0)]
    InvalidKey(String),
    #[error("Key set has no keys")]
    EmptyKeySet,
}

#[derive(Debug)]
struct KeySet {
    keys: BTreeMap<String, Arc<KeyMaterial>>,
    primary: SigningAlgorithm,
    version: u64,
    rotated_at: Option<OffsetDateTime>,
}

impl KeySet {
    fn active_for(&self, algorithm: SigningAlgorithm) -> Option<&Arc<KeyMaterial>> {
        self.keys
            .values()
            .find(|key| key.algorithm() == algorithm && key.is_active())
    }
}

/// Holds the provider's signing keys.
///
/// Readers take a cheap clone of the current snapshot and never block on
/// rotation. Writers serialize on `rotation_lock`, build the next snapshot off
/// to the side and publish it with a single swap. At most one key per
/// algorithm is active at any time.
pub struct KeyStore {
    provider: Arc<ProviderConfiguration>,
    state: RwLock<Arc<KeySet>>,
    rotation_lock: Mutex<()>,
}

impl KeyStore {
    pub fn generate(provider: Arc<ProviderConfiguration>) -> Result<Self, KeyStoreError> {
        let algorithm = *provider.signing_algorithm();
        let key = KeyMaterial::generate(
            algorithm,
            provider.clock().now(),
            provider.ttl().signing_key,
            *provider.rsa_key_size(),
        )?;
        info!("Key store initialized with {} key {}", algorithm, key.key_id());
        let mut keys = BTreeMap::new();
        keys.insert(key.key_id().to_owned(), Arc::new(key));
        Ok(Self::with_keys(provider, keys, algorithm))
    }

    /// Builds a store from previously exported private keys. The first key of
    /// each algorithm becomes active and the first key overall decides which
    /// algorithm signs by default.
    pub fn load(provider: Arc<ProviderConfiguration>, jwks: &JwkSet) -> Result<Self, KeyStoreError> {
        let now = provider.clock().now();
        let lifetime = provider.ttl().signing_key;
        let mut primary = None;
        let mut seen_algorithms = HashSet::new();
        let mut keys = BTreeMap::new();
        for jwk in jwks.iter() {
            let mut key = KeyMaterial::import(jwk.clone(), now, lifetime)?;
            if !seen_algorithms.insert(key.algorithm()) {
                key = key.retired();
            }
            if primary.is_none() {
                primary = Some(key.algorithm());
            }
            match keys.entry(key.key_id().to_owned()) {
                Entry::Occupied(entry) => {
                    return Err(KeyStoreError::InvalidKey(format!(
                        "duplicate key id {}",
                        entry.key()
                    )))
                }
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(key));
                }
            }
        }
        let primary = primary.ok_or(KeyStoreError::EmptyKeySet)?;
        info!("Key store loaded {} keys, signing with {}", keys.len(), primary);
        Ok(Self::with_keys(provider, keys, primary))
    }

    fn with_keys(
        provider: Arc<ProviderConfiguration>,
        keys: BTreeMap<String, Arc<KeyMaterial>>,
        primary: SigningAlgorithm,
    ) -> Self {
        let key_set = KeySet {
            keys,
            primary,
            version: 1,
            rotated_at: None,
        };
        Self {
            provider,
            state: RwLock::new(Arc::new(key_set)),
            rotation_lock: Mutex::new(()),
        }
    }

    fn snapshot(&self) -> Arc<KeySet> {
        self.state.read().clone()
    }

    pub fn primary_algorithm(&self) -> SigningAlgorithm {
        self.snapshot().primary
    }

    pub fn current_signing_key(&self) -> Result<Arc<KeyMaterial>, KeyStoreError> {
        let snapshot = self.snapshot();
        snapshot
            .active_for(snapshot.primary)
            .cloned()
            .ok_or(KeyStoreError::NoActiveKey(snapshot.primary))
    }

    pub fn signing_key_for(
        &self,
        algorithm: SigningAlgorithm,
    ) -> Result<Arc<KeyMaterial>, KeyStoreError> {
        self.snapshot()
            .active_for(algorithm)
            .cloned()
            .ok_or(KeyStoreError::NoActiveKey(algorithm))
    }

    /// Public keys that can still verify tokens, ordered by key id.
    pub fn list_public_keys(&self) -> Vec<PublicKeyView> {
        let now = self.provider.clock().now();
        self.snapshot()
            .keys
            .values()
            .filter(|key| !key.is_expired(now))
            .map(|key| key.public_view())
            .collect()
    }

    pub fn jwks(&self) -> JwkSet {
        JwkSet::new(
            self.list_public_keys()
                .into_iter()
                .map(PublicKeyView::into_jwk)
                .collect(),
        )
    }

    pub fn find_verification_key(&self, kid: &str) -> Option<Arc<KeyMaterial>> {
        let now = self.provider.clock().now();
        self.snapshot()
            .keys
            .get(kid)
            .filter(|key| !key.is_expired(now))
            .cloned()
    }

    /// Creates a new active key for `algorithm` (the primary algorithm when
    /// `None`) and retires the key it replaces. The new key's algorithm
    /// becomes the primary one.
    pub fn rotate(
        &self,
        algorithm: Option<SigningAlgorithm>,
    ) -> Result<Arc<KeyMaterial>, KeyStoreError> {
        let _guard = self.rotation_lock.lock();
        let current = self.snapshot();
        let algorithm = algorithm.unwrap_or(current.primary);
        let now = self.provider.clock().now();
        let new_key = Arc::new(KeyMaterial::generate(
            algorithm,
            now,
            self.provider.ttl().signing_key,
            *self.provider.rsa_key_size(),
        )?);

        let mut keys = current.keys.clone();
        let previous = current.active_for(algorithm).cloned();
        if let Some(previous) = &previous {
            keys.insert(
                previous.key_id().to_owned(),
                Arc::new(previous.retired()),
            );
        }
        keys.insert(new_key.key_id().to_owned(), new_key.clone());

        *self.state.write() = Arc::new(KeySet {
            keys,
            primary: algorithm,
            version: current.version + 1,
            rotated_at: Some(now),
        });
        info!(
            "Rotated {} signing key {} -> {}",
            algorithm,
            previous.as_ref().map(|key| key.key_id()).unwrap_or("none"),
            new_key.key_id()
        );
        Ok(new_key)
    }

    /// Drops retired keys whose validity window has closed.
    pub fn purge_expired(&self) -> usize {
        let _guard = self.rotation_lock.lock();
        let current = self.snapshot();
        let now = self.provider.clock().now();
        let keys: BTreeMap<String, Arc<KeyMaterial>> = current
            .keys
            .iter()
            .filter(|(_, key)| !key.is_expired(now))
            .map(|(kid, key)| (kid.clone(), key.clone()))
            .collect();
        let purged = current.keys.len() - keys.len();
        if purged == 0 {
            debug!("No expired keys to purge");
            return 0;
        }
        *self.state.write() = Arc::new(KeySet {
            keys,
            primary: current.primary,
            version: current.version + 1,
            rotated_at: current.rotated_at,
        });
        info!("Purged {} expired signing keys", purged);
        purged
    }

    /// Incremented on every change to the key set.
    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    pub fn last_rotation(&self) -> Option<OffsetDateTime> {
        self.snapshot().rotated_at
    }
}
