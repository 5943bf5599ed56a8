use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD as base64_engine;
use base64::Engine;
use josekit::jwk::Jwk;
use josekit::jws::{JwsSigner, JwsVerifier};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::jose::error::JWTError;
use crate::jose::jws::SigningAlgorithm;

pub trait JwkExt {
    fn signing_algorithm(&self) -> Result<SigningAlgorithm, JWTError>;
    fn get_signer(&self) -> Result<Box<dyn JwsSigner>, JWTError>;
    fn get_verifier(&self) -> Result<Box<dyn JwsVerifier>, JWTError>;
    /// RFC 7638 SHA-256 thumbprint, base64url encoded without padding.
    fn thumbprint(&self) -> Result<String, JWTError>;
    /// Copy of this key with every private member removed.
    fn public_only(&self) -> Result<Jwk, JWTError>;
}

const PRIVATE_MEMBERS: &[&str] = &["d", "p", "q", "dp", "dq", "qi", "oth", "k"];

impl JwkExt for Jwk {
    fn signing_algorithm(&self) -> Result<SigningAlgorithm, JWTError> {
        let alg = self.algorithm().ok_or(JWTError::JWKAlgorithmNotFound)?;
        Ok(SigningAlgorithm::from_str(alg)?)
    }

    fn get_signer(&self) -> Result<Box<dyn JwsSigner>, JWTError> {
        self.signing_algorithm()?
            .signer(self)
            .map_err(JWTError::SignerCreationError)
    }

    fn get_verifier(&self) -> Result<Box<dyn JwsVerifier>, JWTError> {
        self.signing_algorithm()?
            .verifier(self)
            .map_err(JWTError::VerifierCreationError)
    }

    fn thumbprint(&self) -> Result<String, JWTError> {
        // members must appear in lexicographic order with no whitespace
        let canonical = match self.key_type() {
            "RSA" => format!(
                r#"{{"e":{},"kty":"RSA","n":{}}}"#,
                required_member(self, "e")?,
                required_member(self, "n")?
            ),
            "EC" => format!(
                r#"{{"crv":{},"kty":"EC","x":{},"y":{}}}"#,
                required_member(self, "crv")?,
                required_member(self, "x")?,
                required_member(self, "y")?
            ),
            "OKP" => format!(
                r#"{{"crv":{},"kty":"OKP","x":{}}}"#,
                required_member(self, "crv")?,
                required_member(self, "x")?
            ),
            other => {
                return Err(JWTError::InvalidJwtFormat(format!(
                    "Unsupported key type {}",
                    other
                )))
            }
        };
        Ok(base64_engine.encode(Sha256::digest(canonical.as_bytes())))
    }

    fn public_only(&self) -> Result<Jwk, JWTError> {
        let members: &Map<String, Value> = self.as_ref();
        let mut members = members.clone();
        for member in PRIVATE_MEMBERS {
            members.remove(*member);
        }
        Jwk::from_map(members).map_err(JWTError::InvalidJwk)
    }
}

fn required_member(jwk: &Jwk, name: &'static str) -> Result<String, JWTError> {
    match jwk.parameter(name) {
        Some(Value::String(value)) => Ok(serde_json::to_string(value)?),
        _ => Err(JWTError::MissingJwkParameter(name)),
    }
}
