use std::fmt;
use std::fmt::{Debug, Formatter};

use josekit::jwk::alg::ec::EcCurve;
use josekit::jwk::alg::ed::EdCurve;
use josekit::jwk::Jwk;
use josekit::jws::JwsVerifier;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

use idp_types::jose::jwk_ext::JwkExt;
use idp_types::jose::jws::{KeyType, SigningAlgorithm};

use crate::keystore::KeyStoreError;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    Active,
    Retired,
}

/// One asymmetric signing key and its validity window.
///
/// Everything except `status` is fixed at construction. The private half is
/// only reachable from inside this crate and never serialized.
#[derive(Clone)]
pub struct KeyMaterial {
    key_id: String,
    algorithm: SigningAlgorithm,
    public: Jwk,
    private: Jwk,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    status: KeyStatus,
}

impl KeyMaterial {
    pub fn generate(
        algorithm: SigningAlgorithm,
        not_before: OffsetDateTime,
        lifetime: Duration,
        rsa_key_size: u32,
    ) -> Result<Self, KeyStoreError> {
        let private = match algorithm.key_type() {
            KeyType::Rsa => Jwk::generate_rsa_key(rsa_key_size),
            KeyType::Ec => Jwk::generate_ec_key(ec_curve(algorithm)),
            KeyType::Okp => Jwk::generate_ed_key(EdCurve::Ed25519),
        }
        .map_err(|err| KeyStoreError::KeyGeneration {
            algorithm,
            source: err,
        })?;
        Self::from_private(private, algorithm, not_before, lifetime)
    }

    /// Imports a private JWK. The key must carry an `alg`; its `kid` is kept
    /// when present and derived from the thumbprint otherwise.
    pub fn import(
        private: Jwk,
        not_before: OffsetDateTime,
        lifetime: Duration,
    ) -> Result<Self, KeyStoreError> {
        let algorithm = private
            .signing_algorithm()
            .map_err(|err| KeyStoreError::InvalidKey(err.to_string()))?;
        Self::from_private(private, algorithm, not_before, lifetime)
    }

    fn from_private(
        mut private: Jwk,
        algorithm: SigningAlgorithm,
        not_before: OffsetDateTime,
        lifetime: Duration,
    ) -> Result<Self, KeyStoreError> {
        if private.parameter("d").is_none() {
            return Err(KeyStoreError::InvalidKey(
                "signing keys must include their private part".to_owned(),
            ));
        }
        if private.key_type() != algorithm.key_type().name() {
            return Err(KeyStoreError::InvalidKey(format!(
                "{} cannot be used with a {} key",
                algorithm,
                private.key_type()
            )));
        }
        private.set_algorithm(algorithm.name());
        private.set_key_use("sig");
        let key_id = match private.key_id() {
            Some(kid) => kid.to_owned(),
            None => private
                .thumbprint()
                .map_err(|err| KeyStoreError::InvalidKey(err.to_string()))?,
        };
        private.set_key_id(&key_id);
        // fails on curve mismatch or malformed members
        algorithm
            .signer(&private)
            .map_err(|err| KeyStoreError::InvalidKey(err.to_string()))?;
        let public = private
            .public_only()
            .map_err(|err| KeyStoreError::InvalidKey(err.to_string()))?;

        Ok(Self {
            key_id,
            algorithm,
            public,
            private,
            not_before,
            not_after: not_before + lifetime,
            status: KeyStatus::Active,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub fn not_before(&self) -> OffsetDateTime {
        self.not_before
    }

    pub fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }

    pub fn status(&self) -> KeyStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == KeyStatus::Active
    }

    /// Active keys never expire; only rotation ends their signing role.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.status == KeyStatus::Retired && now > self.not_after
    }

    pub fn retired(&self) -> Self {
        Self {
            status: KeyStatus::Retired,
            ..self.clone()
        }
    }

    pub fn public_view(&self) -> PublicKeyView {
        PublicKeyView(self.public.clone())
    }

    pub fn verifier(&self) -> Result<Box<dyn JwsVerifier>, josekit::JoseError> {
        self.algorithm.verifier(&self.public)
    }

    pub(crate) fn signing_jwk(&self) -> &Jwk {
        &self.private
    }
}

impl Debug for KeyMaterial {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn ec_curve(algorithm: SigningAlgorithm) -> EcCurve {
    match algorithm {
        SigningAlgorithm::Es384 => EcCurve::P384,
        SigningAlgorithm::Es512 => EcCurve::P521,
        _ => EcCurve::P256,
    }
}

/// Public half of a key, serialized as a JWK.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicKeyView(Jwk);

impl PublicKeyView {
    pub fn key_id(&self) -> Option<&str> {
        self.0.key_id()
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.0.algorithm()
    }

    pub fn jwk(&self) -> &Jwk {
        &self.0
    }

    pub fn into_jwk(self) -> Jwk {
        self.0
    }
}

impl Serialize for PublicKeyView {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let members: &Map<String, Value> = self.0.as_ref();
        let mut map = serializer.serialize_map(Some(members.len()))?;
        for (k, v) in members {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
