use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use time::Duration;
use tracing::debug;
use uuid::Uuid;

use idp_types::claims::{Claims, ISSUER, SUBJECT};
use idp_types::jose::jws::SigningAlgorithm;
use idp_types::nonce::Nonce;
use idp_types::subject::Subject;

use crate::configuration::clock::Clock;
use crate::configuration::ProviderConfiguration;
use crate::id_token::IdentityToken;
use crate::id_token_builder::{IdTokenBuilder, IdTokenError};
use crate::key_material::KeyMaterial;
use crate::keystore::{KeyStore, KeyStoreError};

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("{}", .0)]
    InvalidClaims(String),
    #[error("Unable to obtain signing key")]
    KeyStore(#[from] KeyStoreError),
    #[error("Error encoding identity token")]
    Encoding(#[source] IdTokenError),
}

impl From<IdTokenError> for SigningError {
    fn from(err: IdTokenError) -> Self {
        match err {
            IdTokenError::InvalidClaim(ref source) => {
                SigningError::InvalidClaims(format!("Invalid claim value: {}", source))
            }
            other => SigningError::Encoding(other),
        }
    }
}

pub struct TokenSigner {
    provider: Arc<ProviderConfiguration>,
    keystore: Arc<KeyStore>,
}

impl TokenSigner {
    pub fn new(provider: Arc<ProviderConfiguration>, keystore: Arc<KeyStore>) -> Self {
        Self { provider, keystore }
    }

    /// Signs `claims` with the current key. `aud`, `iat`, `exp` and `jti` are
    /// always set here and override caller values; `iss` defaults to the
    /// configured issuer.
    pub fn issue(
        &self,
        claims: Claims,
        audience: impl Into<String>,
        ttl: Duration,
    ) -> Result<IdentityToken, SigningError> {
        let audience = audience.into();
        validate(&claims, &audience, ttl, self.provider.ttl().id_token)?;
        let key = self.keystore.current_signing_key()?;
        self.sign(&key, claims, audience, ttl)
    }

    /// Like [`TokenSigner::issue`] but signs with the active key of
    /// `algorithm` instead of the primary one.
    pub fn issue_with(
        &self,
        algorithm: SigningAlgorithm,
        claims: Claims,
        audience: impl Into<String>,
        ttl: Duration,
    ) -> Result<IdentityToken, SigningError> {
        let audience = audience.into();
        validate(&claims, &audience, ttl, self.provider.ttl().id_token)?;
        let key = self.keystore.signing_key_for(algorithm)?;
        self.sign(&key, claims, audience, ttl)
    }

    fn sign(
        &self,
        key: &KeyMaterial,
        mut claims: Claims,
        audience: String,
        ttl: Duration,
    ) -> Result<IdentityToken, SigningError> {
        let issuer = match claims.issuer() {
            Some(iss) => iss.to_owned(),
            None => self.provider.issuer().as_str().to_owned(),
        };
        let subject = match claims.remove(SUBJECT) {
            Some(Value::String(sub)) => Subject::new(sub),
            _ => return Err(SigningError::InvalidClaims("sub is required".to_owned())),
        };
        let nonce = claims.nonce().map(Nonce::new);
        let issued_at = self.provider.clock().now();
        let expires_at = issued_at + Duration::seconds(ttl.whole_seconds());
        // a token must not outlive the window in which its key is published
        if expires_at > key.not_after() {
            return Err(SigningError::InvalidClaims(format!(
                "token would expire after signing key {} ({})",
                key.key_id(),
                key.not_after()
            )));
        }
        let jti = Uuid::new_v4().to_string();

        debug!("Issuing token for {} with key {}", subject, key.key_id());
        let token = IdTokenBuilder::new(key)
            .with_issuer(issuer)
            .with_sub(subject)
            .with_audience(audience)
            .with_iat(issued_at)
            .with_exp(expires_at)
            .with_jti(jti)
            .with_nonce(nonce)
            .with_custom_claims(claims.into_map())
            .build()?;
        Ok(token)
    }
}

fn validate(
    claims: &Claims,
    audience: &str,
    ttl: Duration,
    max_ttl: Duration,
) -> Result<(), SigningError> {
    match claims.get(SUBJECT) {
        Some(Value::String(sub)) if !sub.is_empty() => {}
        _ => {
            return Err(SigningError::InvalidClaims(
                "sub must be a non-empty string".to_owned(),
            ))
        }
    }
    match claims.get(ISSUER) {
        None => {}
        Some(Value::String(iss)) if !iss.is_empty() => {}
        Some(_) => {
            return Err(SigningError::InvalidClaims(
                "iss must be a non-empty string".to_owned(),
            ))
        }
    }
    if audience.is_empty() {
        return Err(SigningError::InvalidClaims(
            "audience must not be empty".to_owned(),
        ));
    }
    if ttl < Duration::SECOND {
        return Err(SigningError::InvalidClaims(
            "ttl must be at least one second".to_owned(),
        ));
    }
    if ttl > max_ttl {
        return Err(SigningError::InvalidClaims(format!(
            "ttl must not exceed {}",
            max_ttl
        )));
    }
    Ok(())
}
