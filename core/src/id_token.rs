use serde::{Deserialize, Serialize};

use idp_types::claims::Claims;
use idp_types::jose::error::JWTError;
use idp_types::jose::jws::SigningAlgorithm;
use idp_types::jose::jwt::SignedJWT;

/// A signed identity token. Serializes as its compact JWS form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityToken(SignedJWT);

impl IdentityToken {
    pub(crate) fn new(inner: SignedJWT) -> Self {
        IdentityToken(inner)
    }

    pub fn key_id(&self) -> Option<&str> {
        self.0.kid()
    }

    pub fn algorithm(&self) -> Result<SigningAlgorithm, JWTError> {
        self.0.alg()
    }

    pub fn claims(&self) -> Claims {
        Claims::from(self.0.payload().claims_set().clone())
    }

    pub fn serialized(&self) -> &str {
        self.0.serialized()
    }

    pub fn into_serialized(self) -> String {
        self.0.serialized_owned()
    }
}
